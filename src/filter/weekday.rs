use super::FilterError;
use chrono::Weekday;

/// Which weekdays a record may fall on, parsed from a list of day tokens.
///
/// The token count picks the interpretation: no tokens match every day, one
/// token matches that day alone, exactly two tokens form an inclusive range
/// walked forward from the first day (wrapping past Sunday), and three or
/// more tokens are an explicit set with no range inference.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WeekdaySelection {
    #[default]
    Any,
    Single(Weekday),
    Range(Weekday, Weekday),
    Set(Vec<Weekday>),
}

impl WeekdaySelection {
    /// Parse day tokens ("Mon", "tuesday", ...), case-insensitive.
    pub fn parse(tokens: &[String]) -> Result<WeekdaySelection, FilterError> {
        let days = tokens
            .iter()
            .map(|token| {
                token
                    .trim()
                    .parse::<Weekday>()
                    .map_err(|_| FilterError::UnknownWeekday(token.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(match days.as_slice() {
            [] => WeekdaySelection::Any,
            [day] => WeekdaySelection::Single(*day),
            [from, to] => WeekdaySelection::Range(*from, *to),
            _ => WeekdaySelection::Set(days),
        })
    }

    /// Whether the given weekday satisfies the selection.
    pub fn matches(&self, day: Weekday) -> bool {
        match self {
            WeekdaySelection::Any => true,
            WeekdaySelection::Single(single) => day == *single,
            WeekdaySelection::Range(from, to) => days_forward(*from, day) <= days_forward(*from, *to),
            WeekdaySelection::Set(days) => days.contains(&day),
        }
    }
}

/// Days walked forward from `from` to reach `to`, wrapping at the week end.
fn days_forward(from: Weekday, to: Weekday) -> u32 {
    (to.num_days_from_monday() + 7 - from.num_days_from_monday()) % 7
}
