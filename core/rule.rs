use std::fmt;

pub const COLUMNS_PER_TAB: usize = 4;

/// How the indentation run of every line is re-encoded.
///
/// Chosen once per run and passed by value to everything that needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionRule {
    /// One tab per four columns of indentation.
    #[default]
    TabIndent,
    /// Indentation as plain spaces, rounded to a multiple of four.
    AlignedSpace,
}

impl ConversionRule {
    pub fn name(self) -> &'static str {
        match self {
            ConversionRule::TabIndent => "tab-space",
            ConversionRule::AlignedSpace => "aligned all-space",
        }
    }
}

impl fmt::Display for ConversionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
