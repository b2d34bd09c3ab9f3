//! VTK UnstructuredGrid (`.vtu`, ASCII) mesh-field artifacts.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use hl_core::{CancelToken, Real};
use hl_mesh::MeshGeometry;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ExportError, ExportResult};
use crate::job::{ExportJob, ExportSelection, TargetKind};
use crate::writer::write_atomic;

pub const CELL_AREA: &str = "CellArea";
pub const TIME_VALUE: &str = "TimeValue";

const VTK_VERTEX: u8 = 1;
const VTK_POLYGON: u8 = 7;
const VALUES_PER_LINE: usize = 8;

/// A per-cell variable; `steps[t][cell]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshField {
    pub name: String,
    pub steps: Vec<Vec<Real>>,
}

impl MeshField {
    pub fn new(name: impl Into<String>, steps: Vec<Vec<Real>>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// A field with a single step.
    pub fn constant(name: impl Into<String>, values: Vec<Real>) -> Self {
        Self::new(name, vec![values])
    }
}

fn write_values<W: Write>(w: &mut W, indent: &str, values: impl IntoIterator<Item = String>) -> std::io::Result<()> {
    let mut line = Vec::with_capacity(VALUES_PER_LINE);
    for v in values {
        line.push(v);
        if line.len() == VALUES_PER_LINE {
            writeln!(w, "{indent}{}", line.join(" "))?;
            line.clear();
        }
    }
    if !line.is_empty() {
        writeln!(w, "{indent}{}", line.join(" "))?;
    }
    Ok(())
}

fn write_array<W: Write>(
    w: &mut W,
    ty: &str,
    name: Option<&str>,
    components: usize,
    values: impl IntoIterator<Item = String>,
) -> std::io::Result<()> {
    let name = name.map(|n| format!(r#" Name="{}""#, escape(n))).unwrap_or_default();
    let comps = if components > 1 {
        format!(r#" NumberOfComponents="{components}""#)
    } else {
        String::new()
    };
    writeln!(w, r#"        <DataArray type="{ty}"{name}{comps} format="ascii">"#)?;
    write_values(w, "          ", values)?;
    writeln!(w, "        </DataArray>")
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Validated arrays to write, in output order.
struct CellArrays<'a> {
    arrays: Vec<(String, &'a [Real])>,
    times: Vec<Real>,
}

fn select_arrays<'a>(
    mesh: &'a MeshGeometry,
    fields: &'a [MeshField],
    time_steps: &[usize],
    times: Option<&[Real]>,
) -> ExportResult<CellArrays<'a>> {
    let steps: Vec<usize> = if time_steps.is_empty() {
        let available = fields.iter().map(|f| f.steps.len()).min().unwrap_or(0);
        (0..available).collect()
    } else {
        time_steps.to_vec()
    };

    let mut arrays: Vec<(String, &[Real])> = vec![(CELL_AREA.to_string(), &mesh.cell_areas)];
    for field in fields {
        if field.name.is_empty() || field.name == CELL_AREA {
            return Err(ExportError::InvalidRequest(format!(
                "field name '{}' is reserved or empty",
                field.name
            )));
        }
        for &step in &steps {
            let values = field.steps.get(step).ok_or_else(|| {
                ExportError::InvalidRequest(format!(
                    "field '{}' has no time step {step} ({} available)",
                    field.name,
                    field.steps.len()
                ))
            })?;
            if values.len() != mesh.cell_count {
                return Err(ExportError::FieldLength {
                    field: format!("{}_{step}", field.name),
                    expected: mesh.cell_count,
                    actual: values.len(),
                });
            }
            arrays.push((format!("{}_{step}", field.name), values));
        }
    }

    let times = match times {
        Some(t) => steps
            .iter()
            .map(|&s| {
                t.get(s).copied().ok_or_else(|| {
                    ExportError::InvalidRequest(format!("no time value for step {s}"))
                })
            })
            .collect::<ExportResult<Vec<_>>>()?,
        None => Vec::new(),
    };
    Ok(CellArrays { arrays, times })
}

fn write_vtu<W: Write>(
    w: &mut W,
    path: &Path,
    mesh: &MeshGeometry,
    cells: &CellArrays<'_>,
    cancel: &CancelToken,
) -> ExportResult<()> {
    let io = |e: std::io::Error| ExportError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let (points, connectivity, offsets, ty): (Vec<_>, Vec<usize>, Vec<usize>, u8) =
        match &mesh.topology {
            Some(topo) => (
                topo.facepoints.clone(),
                topo.cell_nodes.iter().map(|&n| n as usize).collect(),
                topo.cell_offsets.iter().skip(1).copied().collect(),
                VTK_POLYGON,
            ),
            None => (
                mesh.cell_centers.clone(),
                (0..mesh.cell_count).collect(),
                (1..=mesh.cell_count).collect(),
                VTK_VERTEX,
            ),
        };

    writeln!(w, r#"<?xml version="1.0"?>"#).map_err(io)?;
    writeln!(
        w,
        r#"<VTKFile type="UnstructuredGrid" version="1.0" byte_order="LittleEndian" header_type="UInt64">"#
    )
    .map_err(io)?;
    writeln!(w, "  <UnstructuredGrid>").map_err(io)?;
    if !cells.times.is_empty() {
        writeln!(w, "    <FieldData>").map_err(io)?;
        writeln!(
            w,
            r#"        <DataArray type="Float64" Name="{TIME_VALUE}" NumberOfTuples="{}" format="ascii">"#,
            cells.times.len()
        )
        .map_err(io)?;
        write_values(w, "          ", cells.times.iter().map(|t| t.to_string())).map_err(io)?;
        writeln!(w, "        </DataArray>").map_err(io)?;
        writeln!(w, "    </FieldData>").map_err(io)?;
    }
    writeln!(
        w,
        r#"    <Piece NumberOfPoints="{}" NumberOfCells="{}">"#,
        points.len(),
        mesh.cell_count
    )
    .map_err(io)?;

    writeln!(w, "      <Points>").map_err(io)?;
    write_array(
        w,
        "Float64",
        None,
        3,
        points.iter().map(|p| format!("{} {} 0", p.x, p.y)),
    )
    .map_err(io)?;
    writeln!(w, "      </Points>").map_err(io)?;

    writeln!(w, "      <Cells>").map_err(io)?;
    write_array(w, "Int64", Some("connectivity"), 1, connectivity.iter().map(|c| c.to_string())).map_err(io)?;
    write_array(w, "Int64", Some("offsets"), 1, offsets.iter().map(|o| o.to_string())).map_err(io)?;
    write_array(
        w,
        "UInt8",
        Some("types"),
        1,
        std::iter::repeat_n(ty.to_string(), mesh.cell_count),
    )
    .map_err(io)?;
    writeln!(w, "      </Cells>").map_err(io)?;

    writeln!(w, r#"      <CellData Scalars="{CELL_AREA}">"#).map_err(io)?;
    for (name, values) in &cells.arrays {
        cancel.check()?;
        write_array(w, "Float64", Some(name), 1, values.iter().map(|v| v.to_string())).map_err(io)?;
    }
    writeln!(w, "      </CellData>").map_err(io)?;
    writeln!(w, "    </Piece>").map_err(io)?;
    writeln!(w, "  </UnstructuredGrid>").map_err(io)?;
    writeln!(w, "</VTKFile>").map_err(io)?;
    Ok(())
}

/// Write `mesh` and the requested steps of `fields` to a `.vtu` file.
///
/// Every array is named `<field>_<step>`; `CellArea` is always included.
/// An empty `time_steps` exports every step present in all fields.
pub fn export_mesh_field(
    mesh: &MeshGeometry,
    fields: &[MeshField],
    time_steps: &[usize],
    times: Option<&[Real]>,
    output: &Path,
    cancel: &CancelToken,
) -> ExportResult<ExportJob> {
    let selection = ExportSelection {
        variables: fields.iter().map(|f| f.name.clone()).collect(),
        time_steps: time_steps.to_vec(),
        sections: Vec::new(),
    };
    ExportJob::new(TargetKind::MeshFieldExport, selection, output).run(|_| {
        let is_vtu = output
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("vtu"));
        if !is_vtu {
            return Err(ExportError::UnsupportedTarget {
                path: output.to_path_buf(),
                reason: "mesh fields are written as .vtu".to_string(),
            });
        }
        let cells = select_arrays(mesh, fields, time_steps, times)?;
        debug!(arrays = cells.arrays.len(), cells = mesh.cell_count, "writing vtu");
        write_atomic(output, cancel, |tmp| {
            let file = File::create(tmp).map_err(ExportError::io(tmp))?;
            let mut w = BufWriter::new(file);
            write_vtu(&mut w, tmp, mesh, &cells, cancel)?;
            w.flush().map_err(ExportError::io(tmp))
        })
    })
}

/// What a `.vtu` artifact holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshFieldFile {
    pub point_count: usize,
    pub cell_count: usize,
    pub polygonal: bool,
    pub time_values: Vec<Real>,
    /// Cell arrays in file order.
    pub cell_data: Vec<(String, Vec<Real>)>,
}

impl MeshFieldFile {
    pub fn array(&self, name: &str) -> Option<&[Real]> {
        self.cell_data
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn cell_areas(&self) -> Option<&[Real]> {
        self.array(CELL_AREA)
    }

    pub fn array_names(&self) -> impl Iterator<Item = &str> {
        self.cell_data.iter().map(|(n, _)| n.as_str())
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    FieldData,
    Points,
    Cells,
    CellData,
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(Result::ok)
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Read back the cell count, cell arrays and time values of a `.vtu` file
/// written by [`export_mesh_field`].
pub fn read_mesh_field(path: &Path) -> ExportResult<MeshFieldFile> {
    let text = fs::read_to_string(path).map_err(ExportError::io(path))?;
    let malformed = |reason: String| ExportError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = Reader::from_str(&text);
    reader.config_mut().trim_text(true);

    let mut out = MeshFieldFile {
        point_count: 0,
        cell_count: 0,
        polygonal: false,
        time_values: Vec::new(),
        cell_data: Vec::new(),
    };
    let mut section = Section::None;
    let mut array: Option<String> = None;
    let mut body = String::new();
    let mut saw_piece = false;

    loop {
        match reader.read_event() {
            Err(e) => return Err(malformed(e.to_string())),
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"Piece" => {
                    saw_piece = true;
                    let count = |key: &[u8]| {
                        attr(&e, key)
                            .and_then(|v| v.parse::<usize>().ok())
                            .ok_or_else(|| malformed(format!("Piece lacks {}", String::from_utf8_lossy(key))))
                    };
                    out.point_count = count(b"NumberOfPoints")?;
                    out.cell_count = count(b"NumberOfCells")?;
                }
                b"FieldData" => section = Section::FieldData,
                b"Points" => section = Section::Points,
                b"Cells" => section = Section::Cells,
                b"CellData" => section = Section::CellData,
                b"DataArray" => {
                    array = Some(attr(&e, b"Name").unwrap_or_default());
                    body.clear();
                }
                _ => {}
            },
            Ok(Event::Text(t)) if array.is_some() => {
                let chunk = t.unescape().map_err(|e| malformed(e.to_string()))?;
                body.push(' ');
                body.push_str(&chunk);
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"DataArray" => {
                    let name = array.take().unwrap_or_default();
                    let values = body
                        .split_whitespace()
                        .map(|v| v.parse::<Real>())
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|e| malformed(format!("array '{name}': {e}")))?;
                    match section {
                        Section::FieldData if name == TIME_VALUE => out.time_values = values,
                        Section::Cells if name == "types" => {
                            out.polygonal = values.iter().any(|&t| t == VTK_POLYGON as Real);
                        }
                        Section::CellData => out.cell_data.push((name, values)),
                        _ => {}
                    }
                }
                b"FieldData" | b"Points" | b"Cells" | b"CellData" => section = Section::None,
                _ => {}
            },
            Ok(_) => {}
        }
    }

    if !saw_piece {
        return Err(malformed("no Piece element".to_string()));
    }
    for (name, values) in &out.cell_data {
        if values.len() != out.cell_count {
            return Err(malformed(format!(
                "cell array '{name}' has {} values for {} cells",
                values.len(),
                out.cell_count
            )));
        }
    }
    Ok(out)
}
