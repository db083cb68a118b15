use chrono::NaiveDate;

/// Format of the day part of an access-log timestamp, e.g. `10/Oct/2023`
pub const DATE_FORMAT: &str = "%d/%b/%Y";

/// Number of characters taken from the bracketed timestamp as the date
const DATE_PREFIX_LEN: usize = 11;

const STATUS_COLUMN: usize = 8;
const FORWARDED_COLUMN: usize = 10;

/// A request extracted from one log line. Borrows from the line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord<'a> {
    /// The quoted request, e.g. `GET /index.html HTTP/1.1`
    pub request_line: &'a str,
    /// Path component of the request line
    pub path: &'a str,
    /// First column of the line (remote address or host)
    pub client_address: &'a str,
    /// Forwarded-for column, empty when the line is too short
    pub forwarded_for: &'a str,
    /// Day of the request; None when date bucketing is off
    pub date: Option<NaiveDate>,
}

/// Result of parsing one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome<'a> {
    Record(RequestRecord<'a>),
    /// Blank line
    Empty,
    /// Status column differs from the accepted status
    StatusFiltered,
    /// Status accepted but the timestamp fragment is not a `dd/Mon/yyyy` date
    MalformedDate(&'a str),
}

/// Returns the `position`-th segment of `s` split on `sep`, or `""` when there
/// are not that many segments.
pub fn split_at_position(s: &str, sep: char, position: usize) -> &str {
    s.split(sep).nth(position).unwrap_or("")
}

/// Positional parser for access-log lines.
///
/// Fields are located by column index, not by grammar:
///
/// ```text
/// 10.0.0.1 - - [10/Oct/2023:10:00:00 +0000] "GET /api/users HTTP/1.1" 200 512 "fwd"
/// ^0                                                                  ^8      ^10
/// ```
///
/// Short or malformed lines yield empty fields instead of errors.
#[derive(Debug, Clone)]
pub struct LineParser {
    accepted_status: String,
    parse_dates: bool,
}

impl LineParser {
    pub fn new(accepted_status: impl Into<String>, parse_dates: bool) -> Self {
        Self {
            accepted_status: accepted_status.into(),
            parse_dates,
        }
    }

    pub fn parse<'a>(&self, line: &'a str) -> LineOutcome<'a> {
        if line.is_empty() {
            return LineOutcome::Empty;
        }

        let request_line = split_at_position(line, '"', 1);
        let path = split_at_position(request_line, ' ', 1);
        let client_address = split_at_position(line, ' ', 0);
        let status = split_at_position(line, ' ', STATUS_COLUMN);
        let forwarded_for = split_at_position(line, ' ', FORWARDED_COLUMN);

        if status != self.accepted_status {
            return LineOutcome::StatusFiltered;
        }

        let date = if self.parse_dates {
            let fragment = date_fragment(line);
            match parse_date(fragment) {
                Some(date) => Some(date),
                None => return LineOutcome::MalformedDate(fragment),
            }
        } else {
            None
        };

        LineOutcome::Record(RequestRecord {
            request_line,
            path,
            client_address,
            forwarded_for,
            date,
        })
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new("200", true)
    }
}

/// First eleven characters after the first `[`, or fewer if the line ends sooner
fn date_fragment(line: &str) -> &str {
    let stamp = split_at_position(line, '[', 1);
    match stamp.char_indices().nth(DATE_PREFIX_LEN) {
        Some((end, _)) => &stamp[..end],
        None => stamp,
    }
}

fn parse_date(fragment: &str) -> Option<NaiveDate> {
    if fragment.chars().count() < DATE_PREFIX_LEN {
        return None;
    }
    NaiveDate::parse_from_str(fragment, DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = concat!(
        r#"10.0.0.1 - - [10/Oct/2023:10:00:00 +0000] "GET /api/users HTTP/1.1" "#,
        r#"200 512 "10.9.8.7" "curl/8.0""#
    );

    fn record(outcome: LineOutcome<'_>) -> RequestRecord<'_> {
        match outcome {
            LineOutcome::Record(record) => record,
            other => panic!("expected a record, got {:?}", other),
        }
    }

    #[test]
    fn test_split_at_position() {
        assert_eq!(split_at_position("a b c", ' ', 0), "a");
        assert_eq!(split_at_position("a b c", ' ', 2), "c");
        assert_eq!(split_at_position("a b c", ' ', 3), "");
        assert_eq!(split_at_position("", ' ', 0), "");
        assert_eq!(split_at_position("a  b", ' ', 1), "");
        assert_eq!(split_at_position("no quotes here", '"', 1), "");
    }

    #[test]
    fn test_parse_full_line() {
        let parsed = record(LineParser::default().parse(LINE));
        assert_eq!(parsed.request_line, "GET /api/users HTTP/1.1");
        assert_eq!(parsed.path, "/api/users");
        assert_eq!(parsed.client_address, "10.0.0.1");
        assert_eq!(parsed.forwarded_for, "\"10.9.8.7\"");
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2023, 10, 10));
    }

    #[test]
    fn test_empty_line_is_skipped() {
        assert_eq!(LineParser::default().parse(""), LineOutcome::Empty);
    }

    #[test]
    fn test_non_accepted_status_is_filtered() {
        let line = LINE.replace(" 200 ", " 404 ");
        assert_eq!(LineParser::default().parse(&line), LineOutcome::StatusFiltered);

        let parser = LineParser::new("404", true);
        assert!(matches!(parser.parse(&line), LineOutcome::Record(_)));
    }

    #[test]
    fn test_short_line_has_empty_fields() {
        // Status sits at column 8, forwarded-for at 10; nothing past column 8 here.
        let line = r#"host - - [01/Jan/2024:00:00:00 +0000] "GET" x y 200"#;
        let parsed = record(LineParser::default().parse(line));
        assert_eq!(parsed.request_line, "GET");
        assert_eq!(parsed.path, "");
        assert_eq!(parsed.forwarded_for, "");
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2024, 1, 1));

        assert_eq!(
            LineParser::default().parse("garbage"),
            LineOutcome::StatusFiltered
        );
    }

    #[test]
    fn test_missing_quote_gives_empty_request() {
        let line = "10.0.0.1 - - [10/Oct/2023:10:00:00 +0000] GET /x HTTP/1.1 200 1 -";
        let parsed = record(LineParser::default().parse(line));
        assert_eq!(parsed.request_line, "");
        assert_eq!(parsed.path, "");
    }

    #[test]
    fn test_malformed_date() {
        let line = LINE.replace("10/Oct/2023", "10/Foo/2023");
        assert_eq!(
            LineParser::default().parse(&line),
            LineOutcome::MalformedDate("10/Foo/2023")
        );

        let line = r#"10.0.0.1 - - [10/Oct] +0000 "GET /api HTTP/1.1" 200 512 - -"#;
        assert!(matches!(
            LineParser::default().parse(line),
            LineOutcome::MalformedDate(_)
        ));

        let line = r#"10.0.0.1 - - 10/Oct/2023 +0000 "GET /api HTTP/1.1" 200 512 - -"#;
        assert_eq!(
            LineParser::default().parse(line),
            LineOutcome::MalformedDate("")
        );
    }

    #[test]
    fn test_multibyte_date_fragment_does_not_panic() {
        let line = r#"10.0.0.1 - - [1é/Oct/2023é:00 +0000] "GET /api HTTP/1.1" 200 512 - -"#;
        assert!(matches!(
            LineParser::default().parse(line),
            LineOutcome::MalformedDate(_)
        ));
    }

    #[test]
    fn test_timestamp_without_timezone_shifts_status_column() {
        // Without the timezone token the status lands in column 7, not 8.
        let line = r#"10.0.0.1 - - [10/Oct/2023:10:00:00] "GET /api/users HTTP/1.1" 200 512 - -"#;
        assert_eq!(split_at_position(line, ' ', 7), "200");
        assert_eq!(LineParser::default().parse(line), LineOutcome::StatusFiltered);

        let line = r#"10.0.0.1 - - [10/Oct/2023:10:00:00 +0000] "GET /api/x HTTP/1.1" 200 1 - -"#;
        let parsed = record(LineParser::default().parse(line));
        assert_eq!(parsed.path, "/api/x");
    }

    #[test]
    fn test_dates_not_parsed_when_disabled() {
        let line = LINE.replace("10/Oct/2023", "not-a-date!");
        let parsed = record(LineParser::new("200", false).parse(&line));
        assert_eq!(parsed.date, None);
        assert_eq!(parsed.path, "/api/users");
    }
}
