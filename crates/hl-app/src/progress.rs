use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    OpeningContainer,
    ReadingCatalog,
    ExtractingMesh,
    ResolvingManning,
    LoadingTerrain,
    GeneratingSections,
    ExtractingSeries,
    Exporting,
    Completed,
}

impl PipelineStage {
    pub fn label(self) -> &'static str {
        match self {
            PipelineStage::OpeningContainer => "Opening container",
            PipelineStage::ReadingCatalog => "Reading catalog",
            PipelineStage::ExtractingMesh => "Extracting mesh",
            PipelineStage::ResolvingManning => "Resolving Manning zones",
            PipelineStage::LoadingTerrain => "Loading terrain",
            PipelineStage::GeneratingSections => "Generating cross-sections",
            PipelineStage::ExtractingSeries => "Extracting series",
            PipelineStage::Exporting => "Exporting",
            PipelineStage::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Request op name, as in the wire format.
    pub op: &'static str,
    pub stage: PipelineStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
}

/// Forwards stage events to an optional callback.
pub(crate) struct Progress<'a> {
    op: &'static str,
    started: Instant,
    callback: Option<&'a mut dyn FnMut(ProgressEvent)>,
}

impl<'a> Progress<'a> {
    pub(crate) fn new(op: &'static str, callback: Option<&'a mut dyn FnMut(ProgressEvent)>) -> Self {
        Self {
            op,
            started: Instant::now(),
            callback,
        }
    }

    pub(crate) fn stage(&mut self, stage: PipelineStage) {
        self.emit(stage, None);
    }

    pub(crate) fn emit(&mut self, stage: PipelineStage, message: Option<String>) {
        if let Some(cb) = self.callback.as_deref_mut() {
            cb(ProgressEvent {
                op: self.op,
                stage,
                elapsed_wall_s: self.started.elapsed().as_secs_f64(),
                message,
            });
        }
    }

    pub(crate) fn elapsed_s(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}
