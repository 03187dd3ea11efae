//! The one place text crosses between UTF-8 and the driver's native encodings.
//!
//! Everything above the driver edge works in `String`/`&str`. Drivers hand wide
//! (UTF-16) or narrow (UTF-8) code units to [`decode_sql_text`] and receive wide
//! buffers from [`encode_wide`].

/// A code unit a driver may use for character data.
pub trait SqlText: Copy + Default + PartialEq {
    /// Decode a run of code units, replacing invalid sequences.
    fn decode(units: &[Self]) -> String;
}

impl SqlText for u8 {
    fn decode(units: &[Self]) -> String {
        String::from_utf8_lossy(units).into_owned()
    }
}

impl SqlText for u16 {
    fn decode(units: &[Self]) -> String {
        String::from_utf16_lossy(units)
    }
}

/// Decode driver text, stopping at the first NUL terminator if there is one.
#[must_use]
pub fn decode_sql_text<T: SqlText>(units: &[T]) -> String {
    let end = units
        .iter()
        .position(|unit| *unit == T::default())
        .unwrap_or(units.len());
    T::decode(&units[..end])
}

/// Encode UTF-8 as UTF-16 code units without a terminator.
#[must_use]
pub fn encode_wide(text: &str) -> Vec<u16> {
    text.encode_utf16().collect()
}

/// Collects wide chunks of a single value until the driver says it is complete.
///
/// Decoding happens once at the end so a surrogate pair split across two chunks
/// is reassembled intact.
#[derive(Debug, Default)]
pub struct WideTextAssembler {
    units: Vec<u16>,
    chunks: usize,
}

impl WideTextAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u16]) {
        self.units.extend_from_slice(chunk);
        self.chunks += 1;
    }

    /// Number of chunks received so far.
    #[must_use]
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Decode every collected unit. Embedded NULs are data here, not terminators.
    #[must_use]
    pub fn finish(self) -> String {
        String::from_utf16_lossy(&self.units)
    }
}
