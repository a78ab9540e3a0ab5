use crate::contract::model::User;

/// One rendered page of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub rows: Vec<User>,
    pub total_matches: usize,
}

/// Filter by case-insensitive name substring, then slice
/// `[page * page_size, page * page_size + page_size)` clipped to the matches.
pub fn project(records: &[User], search_term: &str, page: usize, page_size: usize) -> Projection {
    let needle = search_term.to_lowercase();
    let matches: Vec<&User> = records
        .iter()
        .filter(|u| needle.is_empty() || u.name.to_lowercase().contains(&needle))
        .collect();

    let start = page.saturating_mul(page_size).min(matches.len());
    let end = start.saturating_add(page_size).min(matches.len());

    Projection {
        rows: matches[start..end].iter().map(|u| (*u).clone()).collect(),
        total_matches: matches.len(),
    }
}

/// Search/pagination controls of the table. Any change that can shrink the
/// filtered set or reshape pages sends the view back to page 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    search_term: String,
    page: usize,
    page_size: usize,
    page_size_options: Vec<usize>,
}

impl TableView {
    pub fn new(page_size: usize, page_size_options: Vec<usize>) -> Self {
        Self {
            search_term: String::new(),
            page: 0,
            page_size: page_size.max(1),
            page_size_options,
        }
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_size_options(&self) -> &[usize] {
        &self.page_size_options
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
        self.page = 0;
    }

    pub fn clear_search(&mut self) {
        self.set_search(String::new());
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    /// Returns false (and changes nothing) for sizes outside the configured
    /// options; an empty option list accepts any non-zero size.
    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        let allowed = page_size > 0
            && (self.page_size_options.is_empty() || self.page_size_options.contains(&page_size));
        if allowed {
            self.page_size = page_size;
            self.page = 0;
        }
        allowed
    }

    pub fn project(&self, records: &[User]) -> Projection {
        project(records, &self.search_term, self.page, self.page_size)
    }

    pub fn page_count(&self, total_matches: usize) -> usize {
        total_matches.div_ceil(self.page_size)
    }

    /// Message for an empty page.
    pub fn empty_message(&self) -> String {
        if self.search_term.is_empty() {
            "No users available".to_string()
        } else {
            format!("No users found matching \"{}\"", self.search_term)
        }
    }
}

impl Default for TableView {
    fn default() -> Self {
        Self::new(5, vec![5, 10, 25])
    }
}
