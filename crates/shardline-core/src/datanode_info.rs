//! Prefix and suffix description of actual names.

/// Padding used when rendering shard indices.
pub const DEFAULT_PADDING_CHAR: char = '0';

/// Describes how an actual name is built from a prefix and a numeric suffix.
///
/// `t_order_0_3` under logic table `t_order` has prefix `t_order_0_` and a
/// one-digit suffix. The descriptor lets generated shard indices be rendered
/// back into actual names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataNodeInfo {
    prefix: String,
    padding_char: char,
    suffix_min_length: usize,
}

impl DataNodeInfo {
    pub fn new(prefix: impl Into<String>, suffix_min_length: usize, padding_char: char) -> Self {
        Self {
            prefix: prefix.into(),
            padding_char,
            suffix_min_length,
        }
    }

    /// Derives the descriptor of `actual_name` relative to `logic_name`.
    ///
    /// Data-source names drop their trailing digit run. Table names that start
    /// with the logic name keep it whole, even when it ends in a digit, and
    /// only drop the trailing digit run of the remainder.
    pub fn extract(logic_name: &str, actual_name: &str, is_data_source: bool) -> Self {
        let prefix = if is_data_source {
            strip_trailing_digits(actual_name).to_string()
        } else {
            match split_logic_prefix(logic_name, actual_name) {
                Some((head, tail)) => format!("{head}{}", strip_trailing_digits(tail)),
                None => strip_trailing_digits(actual_name).to_string(),
            }
        };
        let suffix_min_length = actual_name.len() - prefix.len();
        Self::new(prefix, suffix_min_length, DEFAULT_PADDING_CHAR)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn padding_char(&self) -> char {
        self.padding_char
    }

    pub fn suffix_min_length(&self) -> usize {
        self.suffix_min_length
    }

    /// Lowers the suffix length to the shortest suffix among `names` that
    /// share this prefix.
    pub fn narrow_suffix<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        if let Some(shortest) = names
            .into_iter()
            .filter_map(|name| self.suffix_of(name))
            .map(str::len)
            .min()
        {
            self.suffix_min_length = shortest;
        }
        self
    }

    /// The part of `name` following the prefix, matched case-insensitively.
    pub fn suffix_of<'a>(&self, name: &'a str) -> Option<&'a str> {
        let len = self.prefix.len();
        if name.len() >= len
            && name.is_char_boundary(len)
            && name[..len].eq_ignore_ascii_case(&self.prefix)
        {
            Some(&name[len..])
        } else {
            None
        }
    }

    /// Renders a shard index as `prefix` plus the padded index.
    pub fn render(&self, index: usize) -> String {
        let digits = index.to_string();
        let padding: String = std::iter::repeat_n(
            self.padding_char,
            self.suffix_min_length.saturating_sub(digits.len()),
        )
        .collect();
        format!("{}{padding}{digits}", self.prefix)
    }
}

fn strip_trailing_digits(name: &str) -> &str {
    name.trim_end_matches(|ch: char| ch.is_ascii_digit())
}

fn split_logic_prefix<'a>(logic_name: &str, actual_name: &'a str) -> Option<(&'a str, &'a str)> {
    let len = logic_name.len();
    if actual_name.len() >= len
        && actual_name.is_char_boundary(len)
        && actual_name[..len].eq_ignore_ascii_case(logic_name)
    {
        Some(actual_name.split_at(len))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_two_level_suffix() {
        let info = DataNodeInfo::extract("t_order", "t_order_0_0", false);
        assert_eq!(info, DataNodeInfo::new("t_order_0_", 1, '0'));
    }

    #[test]
    fn test_extract_logic_name_ending_in_digit() {
        let info = DataNodeInfo::extract("t_order0", "t_order0_0", false);
        assert_eq!(info.prefix(), "t_order0_");
        assert_eq!(info.suffix_min_length(), 1);
        assert_eq!(info.padding_char(), '0');
    }

    #[test]
    fn test_extract_actual_name_unrelated_to_logic() {
        let info = DataNodeInfo::extract("LOGIC_TABLE", "table_12", false);
        assert_eq!(info.prefix(), "table_");
        assert_eq!(info.suffix_min_length(), 2);
    }

    #[test]
    fn test_extract_data_source() {
        let info = DataNodeInfo::extract("ds", "ds_01", true);
        assert_eq!(info, DataNodeInfo::new("ds_", 2, '0'));
    }

    #[test]
    fn test_extract_without_digits() {
        let info = DataNodeInfo::extract("t_config", "t_config", false);
        assert_eq!(info.prefix(), "t_config");
        assert_eq!(info.suffix_min_length(), 0);
    }

    #[test]
    fn test_narrow_suffix() {
        let info = DataNodeInfo::extract("t", "t_10", false).narrow_suffix(["t_10", "t_9", "x_1"]);
        assert_eq!(info.suffix_min_length(), 1);
    }

    #[test]
    fn test_render_pads_index() {
        let info = DataNodeInfo::new("t_order_", 3, '0');
        assert_eq!(info.render(7), "t_order_007");
        assert_eq!(info.render(1234), "t_order_1234");
    }
}
