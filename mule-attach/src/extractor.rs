use bytes::Bytes;

use crate::analyzer::{Analyzer, AnalyzerInput, FilenameAnalyzer, MimeAnalyzer, SizeAnalyzer};
use crate::{AttachResult, Metadata, MimeDetection};

/// Ordered pipeline of analyzers run over upload content.
///
/// Each analyzer sees the content from the start; an analyzer that returns
/// an error aborts extraction, and with it the upload, before any bytes
/// reach storage.
pub struct Extractor {
    analyzers: Vec<Box<dyn Analyzer>>,
}

impl Extractor {
    /// Default pipeline: size, MIME type (with the given detection mode),
    /// filename.
    pub fn new(detection: MimeDetection) -> Self {
        Self {
            analyzers: vec![
                Box::new(SizeAnalyzer),
                Box::new(MimeAnalyzer::new(detection)),
                Box::new(FilenameAnalyzer),
            ],
        }
    }

    /// Pipeline with no analyzers; useful as a base for fully custom stacks
    pub fn empty() -> Self {
        Self {
            analyzers: Vec::new(),
        }
    }

    /// Append an analyzer to the pipeline
    pub fn with_analyzer<A: Analyzer + 'static>(mut self, analyzer: A) -> Self {
        self.analyzers.push(Box::new(analyzer));
        self
    }

    /// Run the pipeline and collect the resulting metadata
    pub fn extract(
        &self,
        content: &Bytes,
        filename: Option<&str>,
        content_type: Option<&str>,
    ) -> AttachResult<Metadata> {
        let input = AnalyzerInput {
            content,
            filename,
            content_type,
        };

        let mut metadata = Metadata::new();
        for analyzer in &self.analyzers {
            analyzer.analyze(&input, &mut metadata)?;
        }
        Ok(metadata)
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(MimeDetection::default())
    }
}
