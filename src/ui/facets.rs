//! Facet pagination for the secondary panel.

use crate::model::types::FacetGroup;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FacetPage {
    pub groups: Vec<FacetGroup>,
    pub page_index: usize,
    pub total_pages: usize,
    pub groups_per_page: usize,
}

/// Sparse result sets get more facet groups per page.
pub fn groups_per_page_for(exact_hits: usize) -> usize {
    if exact_hits < 10 { 4 } else { 2 }
}

/// Slice `groups` into the requested page, clamping out-of-range requests.
pub fn paginate(groups: &[FacetGroup], requested: i64, groups_per_page: usize) -> FacetPage {
    let per_page = groups_per_page.max(1);
    let total_pages = groups.len().div_ceil(per_page).max(1);
    let last = i64::try_from(total_pages - 1).unwrap_or(i64::MAX);
    let page_index = requested.clamp(0, last) as usize;
    let start = (page_index * per_page).min(groups.len());
    let end = (start + per_page).min(groups.len());
    FacetPage {
        groups: groups[start..end].to_vec(),
        page_index,
        total_pages,
        groups_per_page: per_page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn groups(n: usize) -> Vec<FacetGroup> {
        (0..n)
            .map(|i| FacetGroup {
                field: format!("f{i}"),
                buckets: Vec::new(),
            })
            .collect()
    }

    #[test]
    fn nine_groups_four_per_page_clamps_to_last() {
        let page = paginate(&groups(9), 5, 4);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page_index, 2);
        assert_eq!(page.groups.len(), 1);
        assert_eq!(page.groups[0].field, "f8");
    }

    #[test]
    fn negative_request_lands_on_first_page() {
        let page = paginate(&groups(5), -3, 2);
        assert_eq!(page.page_index, 0);
        assert_eq!(
            page.groups.iter().map(|g| g.field.as_str()).collect::<Vec<_>>(),
            vec!["f0", "f1"]
        );
    }

    #[test]
    fn empty_groups_still_have_one_page() {
        let page = paginate(&[], 4, 2);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.page_index, 0);
        assert!(page.groups.is_empty());
    }

    #[test]
    fn density_depends_on_exact_hits() {
        assert_eq!(groups_per_page_for(0), 4);
        assert_eq!(groups_per_page_for(9), 4);
        assert_eq!(groups_per_page_for(10), 2);
    }

    proptest! {
        #[test]
        fn page_index_always_in_range(
            count in 0usize..50,
            requested in any::<i64>(),
            per_page in prop_oneof![Just(2usize), Just(4usize)],
        ) {
            let page = paginate(&groups(count), requested, per_page);
            prop_assert!(page.total_pages >= 1);
            prop_assert!(page.page_index < page.total_pages);
            prop_assert!(page.groups.len() <= per_page);
        }
    }
}
