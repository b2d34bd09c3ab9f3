use clap::{Parser, Subcommand, ValueEnum};
use hl_app::{
    AppError, AppResult, ChannelRequest, ComputeOptions, ComputeService, HydrographRequest, InProcessCompute,
    ManningRequest, MeshFieldExportRequest, Pipeline, PipelineConfig, ProgressEvent, RasterExportRequest, Request,
    ResultEnvelope, SectionRequest, SectionsGeoJsonRequest, SeriesRequest, TabularExportRequest,
};
use hl_core::Point2;
use hl_export::RasterPolicy;
use hl_sections::RegimeMethod;
use hl_series::BaseFlowPolicy;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hl-cli")]
#[command(about = "Hydrolens CLI - inspect 2D hydraulic model results and export artifacts", long_about = None)]
struct Cli {
    /// Pipeline configuration file (YAML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Abort the request after this many seconds
    #[arg(long, global = true)]
    timeout: Option<f64>,
    /// Pretty-print the result envelope
    #[arg(long, global = true)]
    pretty: bool,
    /// Show stage progress on stderr
    #[arg(long, global = true)]
    progress: bool,
    /// Log more (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a JSON request: inline, a file path, or `-` for stdin
    Request {
        request: String,
    },
    /// File name, size and modification time
    Info {
        path: PathBuf,
    },
    /// List container groups and datasets
    Structure {
        path: PathBuf,
        /// Group to list (default: root)
        #[arg(long)]
        group: Option<String>,
        /// Include every descendant
        #[arg(short, long)]
        recursive: bool,
    },
    /// Container summary and hydraulic dataset classification
    Summary {
        path: PathBuf,
    },
    /// Mesh geometry of one flow area, or all areas
    Mesh {
        path: PathBuf,
        #[arg(long)]
        mesh: Option<String>,
    },
    /// Manning zones derived from stored roughness
    Manning {
        path: PathBuf,
        #[arg(long)]
        mesh: Option<String>,
    },
    /// Boundary hydrographs stored in the model
    Boundaries {
        path: PathBuf,
    },
    /// Time series of a source (`bc:<name>`, `cell:<area>:<index>` or a dataset path)
    Series {
        path: PathBuf,
        source: String,
        #[arg(long)]
        variable: Option<String>,
    },
    /// Peak, base flow and volume of a source
    Hydrograph {
        path: PathBuf,
        source: String,
        #[arg(long)]
        variable: Option<String>,
        #[arg(long, value_enum)]
        base_flow: Option<BaseFlowArg>,
    },
    /// Cross-sections along an alignment
    Sections {
        /// Model to sample depths from
        #[arg(long)]
        model: Option<PathBuf>,
        /// GeoTIFF terrain for elevations
        #[arg(long)]
        terrain: Option<PathBuf>,
        #[arg(long)]
        mesh: Option<String>,
        /// Alignment vertex `x,y`; repeat for each vertex
        #[arg(long = "point", required = true, value_parser = parse_point)]
        points: Vec<Point2>,
        #[arg(long)]
        spacing: f64,
        #[arg(long)]
        width: f64,
        /// Result step whose depths are sampled
        #[arg(long)]
        step: Option<usize>,
    },
    /// Normal and critical depth, energy, scour and regime width of a trapezoidal channel
    Channel {
        #[arg(long)]
        discharge: f64,
        #[arg(long)]
        slope: f64,
        #[arg(long)]
        manning_n: f64,
        #[arg(long)]
        bottom_width: f64,
        /// Horizontal per vertical; 0 is rectangular
        #[arg(long, default_value_t = 0.0)]
        side_slope: f64,
        /// Observed depth (default: normal depth)
        #[arg(long)]
        depth: Option<f64>,
        #[arg(long)]
        velocity: Option<f64>,
        #[arg(long, default_value_t = 0.0)]
        bed_elevation: f64,
        /// Median grain size in mm; enables scour and regime width
        #[arg(long)]
        d50: Option<f64>,
        #[arg(long, value_enum, default_value_t = MethodArg::Lacey)]
        method: MethodArg,
    },
    /// Write cross-sections and their alignment as GeoJSON
    ExportSections {
        output: PathBuf,
        #[arg(long)]
        model: Option<PathBuf>,
        #[arg(long)]
        terrain: Option<PathBuf>,
        #[arg(long)]
        mesh: Option<String>,
        #[arg(long = "point", required = true, value_parser = parse_point)]
        points: Vec<Point2>,
        #[arg(long)]
        spacing: f64,
        #[arg(long)]
        width: f64,
        #[arg(long)]
        step: Option<usize>,
        /// Coordinate system name written to the collection
        #[arg(long)]
        crs: Option<String>,
    },
    /// Write a time series as CSV or JSON (by output extension)
    ExportSeries {
        path: PathBuf,
        source: String,
        output: PathBuf,
        #[arg(long)]
        variable: Option<String>,
    },
    /// Write result fields on the mesh as a .vtu file
    ExportMesh {
        path: PathBuf,
        output: PathBuf,
        /// Result variable; repeat for several
        #[arg(long = "variable", required = true)]
        variables: Vec<String>,
        /// Result step; repeat for several (default: all)
        #[arg(long = "step")]
        steps: Vec<usize>,
        #[arg(long)]
        mesh: Option<String>,
    },
    /// Rasterize one result step to .asc or .tif
    ExportRaster {
        path: PathBuf,
        variable: String,
        output: PathBuf,
        #[arg(long)]
        resolution: f64,
        /// Result step (default: last)
        #[arg(long)]
        step: Option<usize>,
        /// Average this many sub-samples per pixel side
        #[arg(long)]
        supersample: Option<u32>,
        #[arg(long)]
        mesh: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BaseFlowArg {
    FirstSample,
    Minimum,
}

impl From<BaseFlowArg> for BaseFlowPolicy {
    fn from(arg: BaseFlowArg) -> Self {
        match arg {
            BaseFlowArg::FirstSample => BaseFlowPolicy::FirstSample,
            BaseFlowArg::Minimum => BaseFlowPolicy::Minimum,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Lacey,
    Blench,
    Empirical,
}

impl From<MethodArg> for RegimeMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Lacey => RegimeMethod::Lacey,
            MethodArg::Blench => RegimeMethod::Blench,
            MethodArg::Empirical => RegimeMethod::Empirical,
        }
    }
}

fn section_request(
    model: &Option<PathBuf>,
    terrain: &Option<PathBuf>,
    mesh: &Option<String>,
    points: &[Point2],
    spacing: f64,
    width: f64,
    step: Option<usize>,
) -> SectionRequest {
    SectionRequest {
        path: model.clone(),
        mesh_name: mesh.clone(),
        terrain: terrain.clone(),
        alignment: points.to_vec(),
        spacing,
        width,
        intervals: None,
        sample_step: None,
        time_step: step,
        depth_variable: None,
        velocity_variable: None,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let envelope = match run(&cli) {
        Ok(envelope) => envelope,
        Err(e) => ResultEnvelope::failure(&e),
    };
    let json = if cli.pretty {
        envelope.to_json_pretty()
    } else {
        envelope.to_json()
    };
    println!("{json}");

    if envelope.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Logs go to stderr; stdout carries only the envelope.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> AppResult<ResultEnvelope> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let request = build_request(&cli.command)?;
    tracing::debug!(op = request.op(), "request built");

    let mut options = ComputeOptions::default();
    if let Some(secs) = cli.timeout {
        let timeout = Duration::try_from_secs_f64(secs)
            .map_err(|_| AppError::InvalidRequest(format!("invalid timeout {secs}")))?;
        options = options.with_timeout(timeout);
    }

    let compute = InProcessCompute::new(Pipeline::new(config));
    if !cli.progress {
        return Ok(compute.execute(&request, &options));
    }

    let mut last_emit = Instant::now();
    let mut last_stage = None;
    let envelope = compute.execute_with_progress(&request, &options, &mut |event: ProgressEvent| {
        let emit_now = last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
        if emit_now {
            render_progress(&event);
            last_stage = Some(event.stage);
            last_emit = Instant::now();
        }
    });
    clear_progress_line();
    Ok(envelope)
}

fn build_request(command: &Commands) -> AppResult<Request> {
    let request = match command {
        Commands::Request { request } => read_request(request)?,
        Commands::Info { path } => Request::FileInfo { path: path.clone() },
        Commands::Structure {
            path,
            group,
            recursive,
        } => Request::Structure {
            path: path.clone(),
            group: group.clone(),
            recursive: *recursive,
        },
        Commands::Summary { path } => Request::Summary { path: path.clone() },
        Commands::Mesh { path, mesh } => Request::Mesh {
            path: path.clone(),
            mesh_name: mesh.clone(),
        },
        Commands::Manning { path, mesh } => Request::Manning(ManningRequest {
            path: path.clone(),
            mesh_name: mesh.clone(),
            calibration: Default::default(),
            zones: None,
        }),
        Commands::Boundaries { path } => Request::BoundaryConditions { path: path.clone() },
        Commands::Series {
            path,
            source,
            variable,
        } => Request::TimeSeries(SeriesRequest {
            path: path.clone(),
            source: source.clone(),
            variable: variable.clone(),
        }),
        Commands::Hydrograph {
            path,
            source,
            variable,
            base_flow,
        } => Request::Hydrograph(HydrographRequest {
            path: path.clone(),
            source: source.clone(),
            variable: variable.clone(),
            base_flow: base_flow.map(BaseFlowPolicy::from),
        }),
        Commands::Sections {
            model,
            terrain,
            mesh,
            points,
            spacing,
            width,
            step,
        } => Request::CrossSections(section_request(model, terrain, mesh, points, *spacing, *width, *step)),
        Commands::Channel {
            discharge,
            slope,
            manning_n,
            bottom_width,
            side_slope,
            depth,
            velocity,
            bed_elevation,
            d50,
            method,
        } => Request::ChannelAnalysis(ChannelRequest {
            discharge: *discharge,
            slope: *slope,
            manning_n: *manning_n,
            bottom_width: *bottom_width,
            side_slope: *side_slope,
            depth: *depth,
            velocity: *velocity,
            bed_elevation: *bed_elevation,
            d50: *d50,
            method: (*method).into(),
        }),
        Commands::ExportSections {
            output,
            model,
            terrain,
            mesh,
            points,
            spacing,
            width,
            step,
            crs,
        } => Request::ExportSectionsGeoJson(SectionsGeoJsonRequest {
            sections: section_request(model, terrain, mesh, points, *spacing, *width, *step),
            output: output.clone(),
            crs: crs.clone(),
        }),
        Commands::ExportSeries {
            path,
            source,
            output,
            variable,
        } => Request::ExportTabular(TabularExportRequest {
            request: Box::new(Request::TimeSeries(SeriesRequest {
                path: path.clone(),
                source: source.clone(),
                variable: variable.clone(),
            })),
            output: output.clone(),
            format: None,
        }),
        Commands::ExportMesh {
            path,
            output,
            variables,
            steps,
            mesh,
        } => Request::ExportMeshField(MeshFieldExportRequest {
            path: path.clone(),
            mesh_name: mesh.clone(),
            variables: variables.clone(),
            time_steps: steps.clone(),
            output: output.clone(),
        }),
        Commands::ExportRaster {
            path,
            variable,
            output,
            resolution,
            step,
            supersample,
            mesh,
        } => Request::ExportRaster(RasterExportRequest {
            path: path.clone(),
            mesh_name: mesh.clone(),
            variable: variable.clone(),
            time_step: *step,
            resolution: *resolution,
            policy: supersample.map(|factor| RasterPolicy::Supersample { factor }),
            output: output.clone(),
        }),
    };
    Ok(request)
}

/// `arg` is inline JSON when it starts with `{`, `-` for stdin, otherwise a
/// file holding the request.
fn read_request(arg: &str) -> AppResult<Request> {
    let text = if arg.trim_start().starts_with('{') {
        arg.to_string()
    } else if arg == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| AppError::InvalidRequest(format!("cannot read request from stdin: {e}")))?;
        buf
    } else {
        std::fs::read_to_string(arg)
            .map_err(|e| AppError::InvalidRequest(format!("cannot read request file {arg}: {e}")))?
    };
    Ok(serde_json::from_str(&text)?)
}

fn parse_point(s: &str) -> Result<Point2, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y, got '{s}'"))?;
    let coord = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("bad coordinate '{v}': {e}"))
    };
    Ok(Point2::new(coord(x)?, coord(y)?))
}

fn clear_progress_line() {
    eprint!("\r{}\r", " ".repeat(120));
    let _ = io::stderr().flush();
}

fn render_progress(event: &ProgressEvent) {
    let spinner = ['|', '/', '-', '\\'];
    let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
    let mut line = format!(
        "\r{} {} {}  elapsed={:.2}s",
        spinner[spin_idx],
        event.op,
        event.stage.label(),
        event.elapsed_wall_s
    );
    if let Some(msg) = &event.message {
        line.push_str(&format!("  {}", msg));
    }
    eprint!("{}", line);
    let _ = io::stderr().flush();
}
