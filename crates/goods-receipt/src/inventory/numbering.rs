//! PZ document numbering.
//!
//! Numbers read `PZ <N>/<MM>/<YYYY>`. The sequence `N` is assigned as one more
//! than the highest sequence found across stored documents; it is not padded
//! and nothing reserves it, so concurrent writers can reuse a number.

use chrono::NaiveDate;

use super::domain::Document;

const PZ_PREFIX: &str = "PZ ";

/// Sequence component of a stored number, if it parses.
///
/// Takes the text after the first `"PZ "` (or the whole string when the
/// prefix is absent) up to the first `/`, trimmed.
pub fn pz_sequence(number: &str) -> Option<i32> {
    let after_prefix = number
        .split_once(PZ_PREFIX)
        .map(|(_, rest)| rest)
        .unwrap_or(number);
    let sequence = after_prefix
        .split_once('/')
        .map(|(head, _)| head)
        .unwrap_or(after_prefix);
    sequence.trim().parse().ok()
}

/// Highest sequence among `numbers`, or `0` when none parse.
pub fn highest_sequence<'a, I>(numbers: I) -> i32
where
    I: IntoIterator<Item = &'a str>,
{
    numbers
        .into_iter()
        .filter_map(pz_sequence)
        .max()
        .unwrap_or(0)
}

/// Ordering key for document lists. Numbers without the `PZ ` prefix or with
/// an unparseable sequence sort last.
pub fn pz_sort_key(number: Option<&str>) -> i32 {
    number
        .and_then(|number| number.strip_prefix(PZ_PREFIX))
        .and_then(|rest| {
            rest.split_once('/')
                .map(|(head, _)| head)
                .unwrap_or(rest)
                .parse()
                .ok()
        })
        .unwrap_or(i32::MAX)
}

/// Stable ascending sort by [`pz_sort_key`].
pub fn sort_by_number(documents: &mut [Document]) {
    documents.sort_by_key(|document| pz_sort_key(document.number.as_deref()));
}

pub fn format_pz_number(sequence: i32, date: NaiveDate) -> String {
    format!("{PZ_PREFIX}{sequence}/{}", date.format("%m/%Y"))
}

pub fn format_document_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(number: Option<&str>) -> Document {
        Document {
            number: number.map(str::to_string),
            ..Document::default()
        }
    }

    #[test]
    fn sequence_is_read_between_prefix_and_slash() {
        assert_eq!(pz_sequence("PZ 17/01/2024"), Some(17));
        assert_eq!(pz_sequence("PZ  42 /12/2023"), Some(42));
        assert_eq!(pz_sequence("PZ 7"), Some(7));
        assert_eq!(pz_sequence("9/02/2024"), Some(9));
        assert_eq!(pz_sequence("PZ x/01/2024"), None);
        assert_eq!(pz_sequence(""), None);
    }

    #[test]
    fn highest_sequence_ignores_unparseable_numbers() {
        let numbers = ["PZ 3/01/2024", "PZ 11/02/2024", "draft", "PZ /03/2024"];
        assert_eq!(highest_sequence(numbers), 11);
        assert_eq!(highest_sequence(["garbage"]), 0);
        assert_eq!(highest_sequence(Vec::<&str>::new()), 0);
    }

    #[test]
    fn sort_key_places_unparseable_numbers_last() {
        assert_eq!(pz_sort_key(Some("PZ 5/01/2024")), 5);
        assert_eq!(pz_sort_key(Some("5/01/2024")), i32::MAX);
        assert_eq!(pz_sort_key(Some("PZ five/01/2024")), i32::MAX);
        assert_eq!(pz_sort_key(None), i32::MAX);
    }

    #[test]
    fn documents_sort_ascending_by_sequence() {
        let mut documents = vec![
            document(Some("PZ 3/01/2024")),
            document(None),
            document(Some("PZ 1/01/2024")),
            document(Some("broken")),
            document(Some("PZ 2/01/2024")),
        ];

        sort_by_number(&mut documents);

        let numbers: Vec<_> = documents
            .iter()
            .map(|document| document.number.as_deref())
            .collect();
        assert_eq!(
            numbers,
            vec![
                Some("PZ 1/01/2024"),
                Some("PZ 2/01/2024"),
                Some("PZ 3/01/2024"),
                None,
                Some("broken"),
            ]
        );
    }

    #[test]
    fn formats_number_without_padding() {
        let date = NaiveDate::from_ymd_opt(2024, 9, 5).expect("valid date");
        assert_eq!(format_pz_number(4, date), "PZ 4/09/2024");
        assert_eq!(format_document_date(date), "05/09/2024");
    }
}
