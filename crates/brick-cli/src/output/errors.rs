//! Error message formatting with actionable suggestions.

use brick_core::error::BrickError;

use super::colors::ColorSupport;

/// Error formatter with suggestions
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    pub fn with_colors(colors: ColorSupport) -> Self {
        Self { colors }
    }

    /// Format an error, its cause chain, the source location of manifest
    /// errors and a suggestion when one applies
    pub fn format_error(&self, error: &anyhow::Error) -> String {
        let mut output = format!("{}: {}", self.colors.red("error"), error);

        for cause in error.chain().skip(1) {
            output.push('\n');
            output.push_str(&self.colors.dim("caused by"));
            output.push_str(": ");
            output.push_str(&cause.to_string());
        }

        let brick_error = error
            .chain()
            .find_map(|cause| cause.downcast_ref::<BrickError>());

        if let Some(BrickError::TomlParse {
            file, line, column, ..
        }) = brick_error
        {
            output.push('\n');
            output.push_str(&self.format_location(file, *line, *column));
        }

        if let Some(suggestion) = brick_error.and_then(BrickError::suggestion) {
            output.push('\n');
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(suggestion);
        }

        output
    }

    /// Format file location context
    pub fn format_location(&self, file: &str, line: usize, column: usize) -> String {
        format!("{} {}:{}:{}", self.colors.dim("-->"), file, line, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    fn formatter() -> ErrorFormatter {
        ErrorFormatter::with_colors(ColorSupport::disabled())
    }

    #[test]
    fn test_suggestion_is_printed() {
        let error = anyhow::Error::new(BrickError::PackageNotFound {
            name: "zlib".to_string(),
            version: None,
        });
        let text = formatter().format_error(&error);

        assert!(text.starts_with("error: "));
        assert!(text.contains("zlib"));
        assert!(text.contains("\nhelp: "));
    }

    #[test]
    fn test_context_chain_and_location() {
        let result: Result<(), BrickError> = Err(BrickError::TomlParse {
            file: "brick.toml".to_string(),
            message: "expected `=`".to_string(),
            line: 3,
            column: 7,
        });
        let error = result.context("failed to load project").unwrap_err();
        let text = formatter().format_error(&error);

        assert!(text.starts_with("error: failed to load project"));
        assert!(text.contains("caused by: "));
        assert!(text.contains("--> brick.toml:3:7"));
    }
}
