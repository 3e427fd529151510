//! Query Builder pagination operations

use super::builder::QueryBuilder;

impl QueryBuilder {
    /// Add LIMIT clause
    pub fn limit(mut self, count: i64) -> Self {
        self.limit_count = Some(count);
        self
    }

    /// Alias of `limit`
    pub fn take(self, count: i64) -> Self {
        self.limit(count)
    }

    /// Add OFFSET clause
    pub fn offset(mut self, count: i64) -> Self {
        self.offset_value = Some(count);
        self
    }

    /// Alias of `offset`
    pub fn skip(self, count: i64) -> Self {
        self.offset(count)
    }

    /// Limit to one page, pages start at 1
    pub fn for_page(mut self, page: i64, per_page: i64) -> Self {
        self.limit_count = Some(per_page);
        self.offset_value = Some((page.max(1) - 1) * per_page);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_page() {
        let query = QueryBuilder::table("torrents").for_page(3, 15);
        assert_eq!(query.get_limit(), Some(15));
        assert_eq!(query.get_offset(), Some(30));

        let query = QueryBuilder::table("torrents").for_page(0, 15);
        assert_eq!(query.get_offset(), Some(0));
    }
}
