use crate::BlocklistError;
use crate::BlocklistResult;

/// A text template with a single named placeholder, e.g. `||{value}^` or
/// `Updated: {now}`.
///
/// `{{` and `}}` render as literal braces. Any other brace usage is rejected
/// when the template is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
	segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
	Literal(String),
	Placeholder,
}

impl Template {
	/// Parse `source`, accepting only `{placeholder}` substitutions.
	pub fn parse(source: &str, placeholder: &str) -> BlocklistResult<Self> {
		let invalid = |reason: String| {
			BlocklistError::InvalidTemplate {
				template: source.to_string(),
				reason,
			}
		};

		let mut segments = Vec::new();
		let mut literal = String::new();
		let mut chars = source.chars().peekable();

		while let Some(c) = chars.next() {
			match c {
				'{' if chars.peek() == Some(&'{') => {
					chars.next();
					literal.push('{');
				}
				'}' if chars.peek() == Some(&'}') => {
					chars.next();
					literal.push('}');
				}
				'{' => {
					let mut name = String::new();
					loop {
						match chars.next() {
							Some('}') => break,
							Some(c) => name.push(c),
							None => return Err(invalid("unclosed `{`".to_string())),
						}
					}
					if name != placeholder {
						return Err(invalid(format!(
							"unknown placeholder `{{{name}}}`, expected `{{{placeholder}}}`"
						)));
					}
					if !literal.is_empty() {
						segments.push(Segment::Literal(std::mem::take(&mut literal)));
					}
					segments.push(Segment::Placeholder);
				}
				'}' => return Err(invalid("single `}` is not allowed".to_string())),
				c => literal.push(c),
			}
		}

		if !literal.is_empty() {
			segments.push(Segment::Literal(literal));
		}

		Ok(Self { segments })
	}

	/// Substitute `value` for every placeholder.
	pub fn render(&self, value: &str) -> String {
		let mut result = String::new();
		for segment in &self.segments {
			match segment {
				Segment::Literal(text) => result.push_str(text),
				Segment::Placeholder => result.push_str(value),
			}
		}
		result
	}
}
