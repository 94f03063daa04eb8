pub mod finding;
pub mod process;

use std::future::Future;

use crate::error::AnalyzerError;
use finding::AnalysisResult;

/// Something that can analyze playbook source text.
///
/// [`process::ProcessAnalyzer`] runs the external analyzer. Tests and other
/// hosts can swap in an in-process implementation.
pub trait Analyzer {
    fn analyze(
        &self,
        source: &str,
    ) -> impl Future<Output = Result<AnalysisResult, AnalyzerError>>;
}
