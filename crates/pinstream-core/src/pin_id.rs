use regex::Regex;

const PIN_ID_PATTERNS: [&str; 3] = [r"/pin/(\d+)", r"pin-(\d+)", r"id=(\d+)"];

pub fn extract_pin_id(input: &str) -> Option<String> {
    PIN_ID_PATTERNS.iter().find_map(|pattern| {
        let regex = Regex::new(pattern).ok()?;
        let captures = regex.captures(input)?;
        captures.get(1).map(|m| m.as_str().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::extract_pin_id;

    #[test]
    fn test_extracts_id_from_pin_path() {
        let url = "https://www.pinterest.com/pin/1125968653442211/";
        assert_eq!(extract_pin_id(url), Some("1125968653442211".to_string()));
    }

    #[test]
    fn test_extracts_id_from_slug_and_query() {
        assert_eq!(
            extract_pin_id("https://pinterest.com/some-board/pin-4455/"),
            Some("4455".to_string())
        );
        assert_eq!(
            extract_pin_id("https://pinterest.com/share?id=987"),
            Some("987".to_string())
        );
    }

    #[test]
    fn test_path_pattern_wins_over_query() {
        assert_eq!(
            extract_pin_id("https://pinterest.com/pin/111/?id=222"),
            Some("111".to_string())
        );
    }

    #[test]
    fn test_non_numeric_pin_has_no_id() {
        assert_eq!(extract_pin_id("https://pinterest.com/pin/abc/"), None);
        assert_eq!(extract_pin_id("https://pin.it/AbCdEf"), None);
    }
}
