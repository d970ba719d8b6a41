//! Read operations over the published version.
//!
//! Every call takes one snapshot from the publisher up front and works on
//! that immutable version alone, so a result never mixes two versions.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use time::{Month, UtcOffset};

use crate::domain::entities::PostRecord;
use crate::domain::types::{CategoryId, PostId, PostStatus, TagId};

use super::config::StoreConfig;
use super::error::StoreError;
use super::pagination::Page;
use super::publisher::SnapshotPublisher;
use super::version::Version;

/// Filters for the administrative listing. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminFilter {
    pub status: Option<PostStatus>,
    pub keyword: Option<String>,
}

/// One year-month bucket of the archive grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthArchive {
    pub year: i32,
    pub month: u8,
    /// `YYYY-MM`.
    pub key: String,
    /// `June 2024`.
    pub label: String,
    pub count: usize,
    pub posts: Vec<Arc<PostRecord>>,
}

#[derive(Debug, Clone)]
pub struct PostQueries {
    publisher: Arc<SnapshotPublisher>,
    config: StoreConfig,
}

impl PostQueries {
    pub(crate) fn new(publisher: Arc<SnapshotPublisher>, config: StoreConfig) -> Self {
        Self { publisher, config }
    }

    /// The version all other calls would read right now.
    pub fn snapshot(&self) -> Arc<Version> {
        self.publisher.current()
    }

    pub fn get_by_id(&self, id: PostId) -> Result<Arc<PostRecord>, StoreError> {
        self.snapshot()
            .get_by_id(id)
            .cloned()
            .ok_or(StoreError::not_found(id))
    }

    pub fn get_by_slug(&self, slug: &str) -> Result<Arc<PostRecord>, StoreError> {
        self.snapshot()
            .get_by_slug(slug)
            .cloned()
            .ok_or_else(|| StoreError::slug_not_found(slug))
    }

    /// Most recent first. Pages past the end are empty.
    pub fn list_recent(&self, page: usize, page_size: Option<usize>) -> Page<Arc<PostRecord>> {
        let request = self.config.page_request(page, page_size);
        let snapshot = self.snapshot();
        let items = request.slice(snapshot.posts()).to_vec();
        Page::new(items, snapshot.len(), request)
    }

    /// Case-insensitive substring match anywhere in the title or body, so
    /// it is broader than a case-sensitive title-prefix search: `"ust"`
    /// finds "Rust basics" and a lowercase keyword finds a capitalized
    /// title. A blank keyword matches nothing.
    pub fn search(
        &self,
        keyword: &str,
        page: usize,
        page_size: Option<usize>,
    ) -> Page<Arc<PostRecord>> {
        let request = self.config.page_request(page, page_size);
        let Some(matcher) = KeywordMatcher::new(keyword) else {
            return Page::new(Vec::new(), 0, request);
        };

        let snapshot = self.snapshot();
        request.collect(
            snapshot
                .posts()
                .iter()
                .filter(|post| matcher.matches(post))
                .cloned(),
        )
    }

    /// Posts grouped by UTC creation month, newest month first. Members keep
    /// sequence order.
    pub fn archives(&self) -> Vec<MonthArchive> {
        let snapshot = self.snapshot();
        let mut buckets: BTreeMap<(i32, u8), Vec<Arc<PostRecord>>> = BTreeMap::new();

        for post in snapshot.posts() {
            buckets
                .entry(month_of(post))
                .or_default()
                .push(Arc::clone(post));
        }

        buckets
            .into_iter()
            .rev()
            .map(|((year, month), posts)| MonthArchive {
                year,
                month,
                key: format!("{year:04}-{month:02}"),
                label: month_label(year, month),
                count: posts.len(),
                posts,
            })
            .collect()
    }

    /// Posts of one archive bucket.
    pub fn list_by_month(
        &self,
        year: i32,
        month: u8,
        page: usize,
        page_size: Option<usize>,
    ) -> Page<Arc<PostRecord>> {
        self.filtered(page, page_size, |post| month_of(post) == (year, month))
    }

    pub fn list_by_category(
        &self,
        category_id: CategoryId,
        page: usize,
        page_size: Option<usize>,
    ) -> Page<Arc<PostRecord>> {
        self.filtered(page, page_size, |post| post.category_id == Some(category_id))
    }

    pub fn list_by_tag(
        &self,
        tag_id: TagId,
        page: usize,
        page_size: Option<usize>,
    ) -> Page<Arc<PostRecord>> {
        self.filtered(page, page_size, |post| post.tag_ids.contains(&tag_id))
    }

    /// Filtered listing with the total number of matches.
    pub fn list_admin(
        &self,
        filter: &AdminFilter,
        page: usize,
        page_size: Option<usize>,
    ) -> Page<Arc<PostRecord>> {
        let matcher = filter.keyword.as_deref().and_then(KeywordMatcher::new);
        self.filtered(page, page_size, |post| {
            filter.status.is_none_or(|status| post.status == status)
                && matcher.as_ref().is_none_or(|m| m.matches(post))
        })
    }

    fn filtered<F>(&self, page: usize, page_size: Option<usize>, keep: F) -> Page<Arc<PostRecord>>
    where
        F: Fn(&PostRecord) -> bool,
    {
        let request = self.config.page_request(page, page_size);
        let snapshot = self.snapshot();
        request.collect(
            snapshot
                .posts()
                .iter()
                .filter(|post| keep(post))
                .cloned(),
        )
    }
}

struct KeywordMatcher {
    needle: String,
}

impl KeywordMatcher {
    fn new(keyword: &str) -> Option<Self> {
        let trimmed = keyword.trim();
        (!trimmed.is_empty()).then(|| Self {
            needle: trimmed.to_lowercase(),
        })
    }

    fn matches(&self, post: &PostRecord) -> bool {
        post.title.to_lowercase().contains(&self.needle)
            || post.body.to_lowercase().contains(&self.needle)
    }
}

fn month_of(post: &PostRecord) -> (i32, u8) {
    let created = post.created_at.to_offset(UtcOffset::UTC);
    (created.year(), u8::from(created.month()))
}

fn month_label(year: i32, month: u8) -> String {
    match Month::try_from(month) {
        Ok(name) => format!("{name} {year}"),
        Err(_) => format!("{year:04}-{month:02}"),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use time::{Duration, OffsetDateTime};

    use super::*;

    fn record(id: PostId, title: &str, body: &str, created_at: OffsetDateTime) -> PostRecord {
        PostRecord {
            id,
            slug: format!("post-{id}"),
            title: title.to_string(),
            body: body.to_string(),
            status: if id % 2 == 0 {
                PostStatus::Published
            } else {
                PostStatus::Draft
            },
            category_id: Some(id % 3),
            tag_ids: vec![id % 5],
            created_at,
            updated_at: created_at,
        }
    }

    fn queries(records: Vec<PostRecord>) -> PostQueries {
        let version = Version::from_records(records).expect("valid records");
        PostQueries::new(
            Arc::new(SnapshotPublisher::new(version)),
            StoreConfig::default(),
        )
    }

    fn numbered(count: i64) -> PostQueries {
        let now = datetime!(2024-06-01 00:00 UTC);
        queries(
            (1..=count)
                .map(|i| record(i, &format!("Post {i}"), "", now - Duration::hours(i)))
                .collect(),
        )
    }

    #[test]
    fn lookups_by_id_and_slug() {
        let queries = numbered(3);
        assert_eq!(queries.get_by_id(2).expect("found").slug, "post-2");
        assert_eq!(queries.get_by_slug("post-3").expect("found").id, 3);
        assert_eq!(queries.get_by_id(99), Err(StoreError::not_found(99)));
        assert_eq!(
            queries.get_by_slug("nope"),
            Err(StoreError::slug_not_found("nope"))
        );
    }

    #[test]
    fn list_recent_pages_through_the_sequence() {
        let queries = numbered(1000);
        let snapshot = queries.snapshot();

        let page = queries.list_recent(2, Some(10));
        assert_eq!(page.items.as_slice(), &snapshot.posts()[10..20]);
        assert_eq!(page.total, 1000);
        assert!(page.has_next());

        assert!(queries.list_recent(101, Some(10)).is_empty());
        assert_eq!(queries.list_recent(1, None).len(), 10);
    }

    #[test]
    fn search_matches_title_or_body_case_insensitively() {
        let now = datetime!(2024-06-01 00:00 UTC);
        let queries = queries(vec![
            record(1, "Rust ownership", "", now - Duration::hours(3)),
            record(2, "Cooking", "a note on RUST removal", now - Duration::hours(2)),
            record(3, "Gardening", "", now - Duration::hours(1)),
        ]);

        let page = queries.search("rust", 1, None);
        let ids: Vec<PostId> = page.items.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(page.total, 2);

        // Substring, not prefix.
        assert_eq!(queries.search("ship", 1, None).total, 1);
        assert!(queries.search("   ", 1, None).is_empty());
        assert_eq!(queries.search("rust", 2, Some(1)).items[0].id, 1);
    }

    #[test]
    fn archives_group_by_month_newest_first() {
        let queries = queries(vec![
            record(1, "a", "", datetime!(2024-01-15 10:00 UTC)),
            record(2, "b", "", datetime!(2024-03-02 10:00 UTC)),
            record(3, "c", "", datetime!(2024-03-20 10:00 UTC)),
            record(4, "d", "", datetime!(2023-12-31 23:30 -02:00)),
        ]);

        let archives = queries.archives();
        let keys: Vec<&str> = archives.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, vec!["2024-03", "2024-01"]);

        let march = &archives[0];
        assert_eq!(march.label, "March 2024");
        assert_eq!(march.count, 2);
        let ids: Vec<PostId> = march.posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 2]);

        // 23:30 at -02:00 is already January in UTC.
        assert_eq!(archives[1].count, 2);

        let page = queries.list_by_month(2024, 1, 1, None);
        assert_eq!(page.total, 2);
    }

    #[test]
    fn list_admin_filters_and_counts() {
        let queries = numbered(30);

        let published = queries.list_admin(
            &AdminFilter {
                status: Some(PostStatus::Published),
                keyword: None,
            },
            1,
            Some(5),
        );
        assert_eq!(published.total, 15);
        assert_eq!(published.len(), 5);
        assert!(
            published
                .items
                .iter()
                .all(|p| p.status == PostStatus::Published)
        );

        let keyword = queries.list_admin(
            &AdminFilter {
                status: Some(PostStatus::Draft),
                keyword: Some("Post 1".to_string()),
            },
            1,
            Some(50),
        );
        // Drafts are odd ids: 1, 11, 13, 15, 17, 19.
        assert_eq!(keyword.total, 6);

        let beyond = queries.list_admin(&AdminFilter::default(), 9, Some(5));
        assert!(beyond.is_empty());
        assert_eq!(beyond.total, 30);
    }

    #[test]
    fn list_by_category_and_tag() {
        let queries = numbered(15);
        assert_eq!(queries.list_by_category(0, 1, None).total, 5);
        assert_eq!(queries.list_by_tag(4, 1, None).total, 3);
        assert!(queries.list_by_tag(9, 1, None).is_empty());
    }
}
