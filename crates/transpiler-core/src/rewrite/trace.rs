/*!
# Match Tracing

One record per composite node visited: where it is, what kind it is, and
which rules matched it with the text each would produce.
*/

use std::fmt;
use std::io::{self, Write};

use crate::ast::Kind;

/// One matching rule's effect at a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceMatch {
    pub rule: String,
    /// The node as tested, rendered.
    pub candidate: String,
    /// The rule's output, rendered.
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceOutcome {
    NoMatch,
    /// Every matching rule in rule order; the first one is applied.
    Matched(Vec<TraceMatch>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub path: String,
    pub kind: Kind,
    pub outcome: TraceOutcome,
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match &self.outcome {
            TraceOutcome::NoMatch => "(nothing)".to_string(),
            TraceOutcome::Matched(found) => found
                .iter()
                .map(|m| format!("{}: {} -> {}", m.rule, flatten(&m.candidate), flatten(&m.replacement)))
                .collect::<Vec<_>>()
                .join("; "),
        };
        write!(f, "{:50} {:15} {}", self.path, self.kind.name(), outcome)
    }
}

/// Collapse multi-line renderings onto one line.
fn flatten(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Destination for trace records.
pub trait TraceSink {
    fn record(&mut self, record: TraceRecord) -> io::Result<()>;
}

impl TraceSink for Vec<TraceRecord> {
    fn record(&mut self, record: TraceRecord) -> io::Result<()> {
        self.push(record);
        Ok(())
    }
}

/// Writes each record as one line.
#[derive(Debug)]
pub struct WriteSink<W: Write> {
    writer: W,
}

impl<W: Write> WriteSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TraceSink for WriteSink<W> {
    fn record(&mut self, record: TraceRecord) -> io::Result<()> {
        writeln!(self.writer, "{record}")
    }
}
