use std::io::{self, Write};

use serde::Serialize;
use vs_core::features::FeatureSet;
use vs_core::report::DiagnosticReport;
use vs_core::traits::Presenter;

/// One JSON object per line on the output.
#[derive(Serialize)]
#[serde(untagged)]
enum Record<'a> {
    Cycle {
        cycle: u64,
        features: &'a FeatureSet,
        analysis: &'a DiagnosticReport,
    },
    Error {
        cycle: u64,
        error: &'a str,
    },
}

/// JSON-lines output for scripting.
///
/// # Example
/// ```
/// use vs_core::features::FeatureSet;
/// use vs_core::report::DiagnosticReport;
/// use vs_core::traits::Presenter;
/// use vs_render::JsonPresenter;
///
/// let mut out = JsonPresenter::new(Vec::new());
/// out.present(&FeatureSet::default(), &DiagnosticReport::default());
/// let line = String::from_utf8(out.into_inner()).unwrap();
/// let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
/// assert_eq!(value["cycle"], 1);
/// ```
pub struct JsonPresenter<W: Write> {
    out: W,
    cycle: u64,
}

impl JsonPresenter<io::Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out, cycle: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_record(&mut self, record: &Record<'_>) {
        let result = serde_json::to_writer(&mut self.out, record)
            .map_err(io::Error::from)
            .and_then(|()| writeln!(self.out))
            .and_then(|()| self.out.flush());
        if let Err(e) = result {
            log::warn!("Sortie JSON impossible : {e}");
        }
    }
}

impl<W: Write> Presenter for JsonPresenter<W> {
    fn present(&mut self, features: &FeatureSet, report: &DiagnosticReport) {
        self.cycle += 1;
        self.write_record(&Record::Cycle {
            cycle: self.cycle,
            features,
            analysis: report,
        });
    }

    fn present_error(&mut self, message: &str) {
        self.cycle += 1;
        self.write_record(&Record::Error {
            cycle: self.cycle,
            error: message,
        });
    }
}
