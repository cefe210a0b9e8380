//! Argument views over the value half of a `name:value` command.

/// Separator between positional parts of a command value.
const PART_SEPARATOR: char = ';';

/// Parsed command value exposing the textual, integer and positional views
/// commands pick their arguments from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    text: String,
    parts: Vec<String>,
}

impl Param {
    /// Splits a raw command value into its parts.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        Self {
            text: value.to_owned(),
            parts: value.split(PART_SEPARATOR).map(str::to_owned).collect(),
        }
    }

    /// Whole value as received.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whole value read as an integer, present only when the value is numeric.
    #[must_use]
    pub fn int(&self) -> Option<i64> {
        if self.text.trim().parse::<f64>().is_ok() {
            leading_int(&self.text)
        } else {
            None
        }
    }

    /// Value split on `;`.
    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Leading integer of the part at `index`.
    #[must_use]
    pub fn int_at(&self, index: usize) -> Option<i64> {
        self.parts.get(index).and_then(|part| leading_int(part))
    }

    /// First part read as a column.
    #[must_use]
    pub fn x(&self) -> Option<i64> {
        self.int_at(0)
    }

    /// Second part read as a row.
    #[must_use]
    pub fn y(&self) -> Option<i64> {
        self.int_at(1)
    }

    /// Third part read as a width.
    #[must_use]
    pub fn w(&self) -> Option<i64> {
        self.int_at(2)
    }

    /// Fourth part read as a height.
    #[must_use]
    pub fn h(&self) -> Option<i64> {
        self.int_at(3)
    }

    /// Text of a `text;x;y` style value.
    #[must_use]
    pub fn anchored_text(&self) -> &str {
        self.parts.first().map_or("", String::as_str)
    }

    /// Column of a `text;x;y` style value.
    #[must_use]
    pub fn anchored_x(&self) -> Option<i64> {
        self.int_at(1)
    }

    /// Row of a `text;x;y` style value.
    #[must_use]
    pub fn anchored_y(&self) -> Option<i64> {
        self.int_at(2)
    }
}

/// Reads an optional sign followed by decimal digits, ignoring whatever
/// trails them.
fn leading_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let digits = rest
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(rest, |(end, _)| &rest[..end]);
    let magnitude = digits.parse::<i64>().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::Param;

    #[test]
    fn numeric_values_expose_an_int() {
        assert_eq!(Param::parse("120").int(), Some(120));
        assert_eq!(Param::parse(" -4 ").int(), Some(-4));
        assert_eq!(Param::parse("12abc").int(), None);
        assert_eq!(Param::parse("").int(), None);
    }

    #[test]
    fn parts_read_their_leading_digits() {
        let param = Param::parse("3;4x;;7");
        assert_eq!(param.parts().len(), 4);
        assert_eq!(param.x(), Some(3));
        assert_eq!(param.y(), Some(4));
        assert_eq!(param.w(), None);
        assert_eq!(param.h(), Some(7));
    }

    #[test]
    fn anchored_values_split_text_from_position() {
        let param = Param::parse("hello;2;5");
        assert_eq!(param.anchored_text(), "hello");
        assert_eq!(param.anchored_x(), Some(2));
        assert_eq!(param.anchored_y(), Some(5));
        assert_eq!(param.text(), "hello;2;5");
    }
}
