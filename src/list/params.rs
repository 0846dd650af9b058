use std::collections::BTreeMap;

use crate::config::MAX_PAGE_SIZE;

/// Page, page size and the declared quick filters pulled from a query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub page: u32,
    pub page_size: u32,
    pub filters: BTreeMap<String, String>,
}

/// First non-empty value for `name`; repeated parameters keep their first element.
pub fn first_value<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == name || k.strip_suffix("[]") == Some(name))
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

fn positive(value: Option<&str>) -> Option<u32> {
    let n = value?.parse::<i64>().ok()?;
    Some(n.clamp(1, u32::MAX as i64) as u32)
}

pub fn parse_list_params(pairs: &[(String, String)], quick_filter_ids: &[&str], default_page_size: u32) -> ListParams {
    let page = positive(first_value(pairs, "page")).unwrap_or(1);
    let page_size = positive(first_value(pairs, "pageSize"))
        .unwrap_or(default_page_size)
        .clamp(1, MAX_PAGE_SIZE);

    let filters = quick_filter_ids
        .iter()
        .filter_map(|id| first_value(pairs, id).map(|v| (id.to_string(), v.to_string())))
        .collect();

    ListParams { page, page_size, filters }
}

/// Canonical `k=v&k=v` form with keys sorted; equal maps serialise equally.
pub fn serialize_filters(filters: &BTreeMap<String, String>) -> String {
    filters.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join("&")
}

fn flag(value: Option<&str>) -> bool {
    matches!(value.map(str::to_ascii_lowercase).as_deref(), Some("true" | "1" | "yes"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub q: Option<String>,
    pub page: u32,
    pub page_size: u32,
    pub active_only: bool,
    pub raw: bool,
    pub sort: Option<String>,
    pub desc: bool,
    pub filters: BTreeMap<String, String>,
}

impl ListQuery {
    pub fn from_pairs(pairs: &[(String, String)], quick_filter_ids: &[&str], default_page_size: u32) -> Self {
        let ListParams { page, page_size, filters } = parse_list_params(pairs, quick_filter_ids, default_page_size);
        Self {
            q: first_value(pairs, "q").map(str::to_string),
            page,
            page_size,
            active_only: flag(first_value(pairs, "activeOnly")),
            raw: flag(first_value(pairs, "raw")),
            sort: first_value(pairs, "sort").map(str::to_string),
            desc: first_value(pairs, "dir").map(|d| d.eq_ignore_ascii_case("desc")).unwrap_or(false),
            filters,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn page_and_size_are_clamped() {
        let p = parse_list_params(&pairs(&[("page", "0"), ("pageSize", "10000")]), &[], 50);
        assert_eq!((p.page, p.page_size), (1, 500));

        let p = parse_list_params(&pairs(&[("page", "-3"), ("pageSize", "0")]), &[], 50);
        assert_eq!((p.page, p.page_size), (1, 1));

        let p = parse_list_params(&pairs(&[("page", "abc")]), &[], 25);
        assert_eq!((p.page, p.page_size), (1, 25));
    }

    #[test]
    fn first_value_wins_and_empties_drop() {
        let p = parse_list_params(
            &pairs(&[("status", "ACTIVE"), ("status", "ZERO"), ("warehouse_id", "  "), ("other", "x")]),
            &["status", "warehouse_id"],
            50,
        );
        assert_eq!(p.filters.len(), 1);
        assert_eq!(p.filters["status"], "ACTIVE");
    }

    #[test]
    fn bracketed_array_params_read_first_element() {
        let p = parse_list_params(&pairs(&[("status[]", "ZERO"), ("status[]", "ACTIVE")]), &["status"], 50);
        assert_eq!(p.filters["status"], "ZERO");
    }

    #[test]
    fn serialization_ignores_insertion_order() {
        let mut a = BTreeMap::new();
        a.insert("b".to_string(), "2".to_string());
        a.insert("a".to_string(), "1".to_string());
        let mut b = BTreeMap::new();
        b.insert("a".to_string(), "1".to_string());
        b.insert("b".to_string(), "2".to_string());
        assert_eq!(serialize_filters(&a), serialize_filters(&b));
        assert_eq!(serialize_filters(&a), "a=1&b=2");
    }

    #[test]
    fn list_query_reads_flags() {
        let q = ListQuery::from_pairs(
            &pairs(&[("q", " tc "), ("activeOnly", "true"), ("raw", "1"), ("sort", "qty"), ("dir", "DESC"), ("page", "3")]),
            &[],
            20,
        );
        assert_eq!(q.q.as_deref(), Some("tc"));
        assert!(q.active_only && q.raw && q.desc);
        assert_eq!(q.sort.as_deref(), Some("qty"));
        assert_eq!(q.offset(), 40);
    }
}
