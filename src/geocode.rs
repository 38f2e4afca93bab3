use thiserror::Error;

const CALL_NAME: &str = "ShowPin(";

/// Location decoded from a row's map button, e.g.
/// `ShowPin(36.85,-76.29,"Norfolk","VA","23511")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geocode {
    pub lat: String,
    pub long: String,
    pub city: String,
    pub state: String,
    pub zip: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeocodeError {
    #[error("no ShowPin(...) call found")]
    NoCall,

    #[error("ShowPin(...) call is not terminated")]
    Unterminated,

    #[error("ShowPin(...) expects 4 or 5 arguments, got {0}")]
    Arity(usize),
}

impl Geocode {
    /// Zip as written to the output; missing zip becomes an empty column.
    pub fn zip_or_empty(&self) -> &str {
        self.zip.as_deref().unwrap_or("")
    }

    /// True when the decoded city/state are the ones shown in the row.
    pub fn matches(&self, city: &str, state: &str) -> bool {
        self.city == city && self.state == state
    }
}

/// Decode the `ShowPin(...)` call embedded in an `onclick` handler.
pub fn parse_show_pin(handler: &str) -> Result<Geocode, GeocodeError> {
    let start = handler.find(CALL_NAME).ok_or(GeocodeError::NoCall)? + CALL_NAME.len();
    let args = split_arguments(&handler[start..])?;

    let mut args = args.into_iter();
    match args.len() {
        4 | 5 => {}
        n => return Err(GeocodeError::Arity(n)),
    }

    // Length was checked above, so each of the first four is present.
    let mut next = || args.next().unwrap_or_default();
    let lat = next();
    let long = next();
    let city = next();
    let state = next();
    let zip = args.next().filter(|zip| !zip.is_empty());

    Ok(Geocode {
        lat,
        long,
        city,
        state,
        zip,
    })
}

/// Split the argument list up to the closing parenthesis, honouring quotes
/// so a city like `"Washington, DC"` stays one argument.
fn split_arguments(rest: &str) -> Result<Vec<String>, GeocodeError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in rest.chars() {
        match quote {
            Some(q) if ch == q => {
                quote = None;
                current.push(ch);
            }
            Some(_) => current.push(ch),
            None => match ch {
                '"' | '\'' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                ',' => {
                    args.push(unquote(&current));
                    current.clear();
                }
                ')' => {
                    args.push(unquote(&current));
                    if args.len() == 1 && args[0].is_empty() {
                        args.clear();
                    }
                    return Ok(args);
                }
                _ => current.push(ch),
            },
        }
    }

    Err(GeocodeError::Unterminated)
}

fn unquote(raw: &str) -> String {
    let trimmed = raw.trim();
    for q in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(q)
            .and_then(|rest| rest.strip_suffix(q))
        {
            return inner.to_string();
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_five_arguments() {
        let geocode =
            parse_show_pin(r#"ShowPin(36.8508,-76.2859,"Norfolk","VA","23511")"#).unwrap();
        assert_eq!(geocode.lat, "36.8508");
        assert_eq!(geocode.long, "-76.2859");
        assert_eq!(geocode.city, "Norfolk");
        assert_eq!(geocode.state, "VA");
        assert_eq!(geocode.zip.as_deref(), Some("23511"));
    }

    #[test]
    fn missing_zip_defaults_to_empty() {
        let geocode = parse_show_pin(r#"ShowPin(30.1,-97.7,"Austin","TX")"#).unwrap();
        assert_eq!(geocode.zip, None);
        assert_eq!(geocode.zip_or_empty(), "");
    }

    #[test]
    fn empty_quoted_zip_counts_as_missing() {
        let geocode = parse_show_pin(r#"ShowPin(30.1,-97.7,"Austin","TX","")"#).unwrap();
        assert_eq!(geocode.zip, None);
    }

    #[test]
    fn tolerates_surrounding_handler_text() {
        let geocode =
            parse_show_pin(r#"event.preventDefault(); ShowPin( 1.5 , 2.5 , 'San Diego' , 'CA' , '92101' ); return false;"#)
                .unwrap();
        assert_eq!(geocode.lat, "1.5");
        assert_eq!(geocode.city, "San Diego");
        assert_eq!(geocode.zip.as_deref(), Some("92101"));
    }

    #[test]
    fn quoted_comma_stays_in_city() {
        let geocode =
            parse_show_pin(r#"ShowPin(38.9,-77.0,"Washington, DC","DC","20001")"#).unwrap();
        assert_eq!(geocode.city, "Washington, DC");
        assert_eq!(geocode.state, "DC");
        assert_eq!(geocode.zip.as_deref(), Some("20001"));
    }

    #[test]
    fn rejects_wrong_arity() {
        assert_eq!(
            parse_show_pin(r#"ShowPin(1,2,"City")"#),
            Err(GeocodeError::Arity(3))
        );
        assert_eq!(
            parse_show_pin(r#"ShowPin(1,2,"A","B","C","D")"#),
            Err(GeocodeError::Arity(6))
        );
        assert_eq!(parse_show_pin("ShowPin()"), Err(GeocodeError::Arity(0)));
    }

    #[test]
    fn reports_missing_or_unterminated_call() {
        assert_eq!(parse_show_pin("OpenMap(1,2)"), Err(GeocodeError::NoCall));
        assert_eq!(
            parse_show_pin(r#"ShowPin(1,2,"A","B""#),
            Err(GeocodeError::Unterminated)
        );
    }

    #[test]
    fn city_and_state_must_both_match() {
        let geocode = parse_show_pin(r#"ShowPin(1,2,"Norfolk","VA","23511")"#).unwrap();
        assert!(geocode.matches("Norfolk", "VA"));
        assert!(!geocode.matches("Norfolk", "NC"));
        assert!(!geocode.matches("Norfolk ", "VA"));
    }
}
