use serde::Deserialize;

// Define pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

pub fn default_page() -> usize {
    1
}

pub fn default_page_size() -> usize {
    20
}

pub const MAX_PAGE_SIZE: usize = 100;

impl PaginationParams {
    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    pub fn page_size(&self) -> usize {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Slice one page out of an already ordered list. Page numbers start at 1;
    /// pages past the end are empty.
    pub fn apply<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let page_size = self.page_size();
        let offset = (self.page() - 1).saturating_mul(page_size);
        items
            .iter()
            .skip(offset)
            .take(page_size)
            .cloned()
            .collect()
    }
}

/// Wall-clock times are exchanged as "HH:MM" strings.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(time) => serializer.serialize_str(&time.format(super::FORMAT).to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| {
                    NaiveTime::parse_from_str(&raw, super::FORMAT).map_err(serde::de::Error::custom)
                })
                .transpose()
        }
    }
}
