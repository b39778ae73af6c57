use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use serde_json::Value;
use std::sync::LazyLock;
use syntect::easy::HighlightLines;
use syntect::highlighting::{self, FontStyle, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use tracing::debug;

pub const DEFAULT_STYLE: &str = "base16-ocean.dark";

static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEMES: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Highlighted {
    pub lines: Vec<Line<'static>>,
    pub background: Option<Color>,
}

pub fn styles() -> Vec<String> {
    THEMES.themes.keys().cloned().collect()
}

pub fn detect(body: &str) -> (Format, String) {
    let trimmed = body.trim_start();
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && let Some(pretty) = serde_json::from_str::<Value>(trimmed)
            .ok()
            .and_then(|value| serde_json::to_string_pretty(&value).ok())
    {
        return (Format::Json, pretty);
    }
    (Format::Yaml, body.to_string())
}

pub fn highlight(body: &str, format: Format, style: &str) -> Highlighted {
    let Some(theme) = THEMES
        .themes
        .get(style)
        .or_else(|| THEMES.themes.get(DEFAULT_STYLE))
    else {
        return plain(body);
    };
    let syntax = SYNTAXES
        .find_syntax_by_extension(format.extension())
        .unwrap_or_else(|| SYNTAXES.find_syntax_plain_text());

    let mut highlighter = HighlightLines::new(syntax, theme);
    let mut lines = Vec::new();
    for line in LinesWithEndings::from(body) {
        let ranges = match highlighter.highlight_line(line, &SYNTAXES) {
            Ok(ranges) => ranges,
            Err(error) => {
                debug!(%error, style, "highlighting failed; showing plain text");
                return plain(body);
            }
        };
        let spans = ranges
            .into_iter()
            .filter_map(|(token_style, text)| {
                let text = text.trim_end_matches(['\n', '\r']);
                (!text.is_empty()).then(|| Span::styled(text.to_string(), span_style(token_style)))
            })
            .collect::<Vec<_>>();
        lines.push(Line::from(spans));
    }

    Highlighted {
        lines,
        background: theme.settings.background.map(rgb),
    }
}

fn plain(body: &str) -> Highlighted {
    Highlighted {
        lines: body.lines().map(|line| Line::from(line.to_string())).collect(),
        background: None,
    }
}

fn span_style(style: highlighting::Style) -> Style {
    let mut out = Style::default().fg(rgb(style.foreground));
    if style.font_style.contains(FontStyle::BOLD) {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        out = out.add_modifier(Modifier::UNDERLINED);
    }
    out
}

fn rgb(color: highlighting::Color) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn json_bodies_are_pretty_printed() {
        let (format, text) = detect("{\"kind\":\"Service\",\"replicas\":2}");
        assert_eq!(format, Format::Json);
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.first(), Some(&"{"));
        assert!(lines.iter().any(|line| line.trim() == "\"kind\": \"Service\","));
    }

    #[test]
    fn non_json_braces_fall_back_to_yaml() {
        assert_eq!(
            detect("{not json"),
            (Format::Yaml, "{not json".to_string())
        );
    }

    #[test]
    fn highlighting_keeps_the_text_and_colours_it() {
        let body = "kind: Service\nspec:\n  replicas: 3\n";
        let highlighted = highlight(body, Format::Yaml, DEFAULT_STYLE);
        let texts = highlighted.lines.iter().map(line_text).collect::<Vec<_>>();
        assert_eq!(texts, vec!["kind: Service", "spec:", "  replicas: 3"]);
        assert!(
            highlighted.lines[0]
                .spans
                .iter()
                .all(|span| matches!(span.style.fg, Some(Color::Rgb(..))))
        );
        assert!(highlighted.background.is_some());
    }

    #[test]
    fn styles_are_sorted_and_unknown_names_use_the_default() {
        let names = styles();
        assert!(names.iter().any(|name| name == DEFAULT_STYLE));
        assert!(names.windows(2).all(|pair| pair[0] <= pair[1]));

        let fallback = highlight("a: 1", Format::Yaml, "no-such-style");
        let default = highlight("a: 1", Format::Yaml, DEFAULT_STYLE);
        assert_eq!(fallback, default);
    }

    #[test]
    fn different_styles_paint_differently() {
        let names = styles();
        let light = names
            .iter()
            .find(|name| name.contains("light"))
            .expect("a light style");
        let dark = highlight("a: 1", Format::Yaml, DEFAULT_STYLE);
        let other = highlight("a: 1", Format::Yaml, light);
        assert_ne!(dark.background, other.background);
    }
}
