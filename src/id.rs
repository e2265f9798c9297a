//! Node id minting

/// Source of block ids, injected by the caller for each parse
pub trait IdSource {
    fn next_id(&mut self) -> String;
}

/// Deterministic ids of the form `<prefix>-<counter>`, counter zero-padded to 7 digits
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        SequentialIds {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        SequentialIds::new("20060102150405")
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self) -> String {
        let id = format!("{}-{:07}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

impl<F> IdSource for F
where
    F: FnMut() -> String,
{
    fn next_id(&mut self) -> String {
        self()
    }
}
