//! Interactive paginated result views.
//!
//! A view owns an immutable match list and renders exactly one page of it at
//! a time — list mode shows summary rows, screenshot mode one record per
//! page with its decoded image. Only the current page's heavy payloads are
//! ever materialized. Navigation is restricted to the original requester,
//! and a view that sits idle past its deadline goes inert: both controls
//! disabled, entry dropped from the registry.

use crate::backends::shodan::{HOST_PAGE_URL, HostMatch, safe_join};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Idle deadline after which a view's controls go permanently inert.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Combined raw-data attachment ceiling per page.
pub const RAW_DATA_CEILING: usize = 8 * 1024 * 1024;

const TRUNCATION_MARKER: &str = "\n... (truncated)\n";

/// Discord embed description limit.
const DESCRIPTION_CEILING: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Summary rows, several records per page.
    List,
    /// One record per page with its screenshot attached.
    Screenshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Decoded image attached to a screenshot-mode page.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Bundled raw-banner attachment for a page.
#[derive(Debug, Clone)]
pub struct RawBundle {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Everything the platform layer needs to draw one page.
#[derive(Debug, Clone)]
pub struct PageRender {
    pub title: String,
    pub description: String,
    pub footer: String,
    pub image: Option<PageImage>,
    pub raw: Option<RawBundle>,
    pub prev_enabled: bool,
    pub next_enabled: bool,
}

/// Result of a navigation action.
#[derive(Debug)]
pub enum NavOutcome {
    /// Page changed; redraw with this render.
    Updated(PageRender),
    /// Actor is not the requester; nothing changed.
    Unauthorized,
    /// The view idled out; final redraw with controls disabled.
    Expired(PageRender),
}

/// One interactive view over an ordered match list.
pub struct PagedView {
    requester: u64,
    matches: Vec<HostMatch>,
    page_size: usize,
    page: usize,
    mode: DisplayMode,
    query: String,
    idle_timeout: Duration,
    last_activity: Instant,
}

impl PagedView {
    pub fn new(
        requester: u64,
        matches: Vec<HostMatch>,
        page_size: usize,
        mode: DisplayMode,
        query: impl Into<String>,
    ) -> Self {
        assert!(page_size > 0, "page_size must be nonzero");
        Self {
            requester,
            matches,
            page_size,
            page: 0,
            mode,
            query: query.into(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            last_activity: Instant::now(),
        }
    }

    #[cfg(test)]
    fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn total_pages(&self) -> usize {
        self.matches.len().div_ceil(self.page_size).max(1)
    }

    pub fn current_page(&self) -> usize {
        self.page
    }

    pub fn is_expired(&self) -> bool {
        self.last_activity.elapsed() >= self.idle_timeout
    }

    /// Move one page in `direction` on behalf of `actor` and re-render.
    pub fn advance(&mut self, actor: u64, direction: Direction) -> NavOutcome {
        if actor != self.requester {
            return NavOutcome::Unauthorized;
        }
        if self.is_expired() {
            return NavOutcome::Expired(self.render_inert());
        }

        self.page = match direction {
            Direction::Previous => self.page.saturating_sub(1),
            Direction::Next => (self.page + 1).min(self.total_pages() - 1),
        };
        self.last_activity = Instant::now();
        NavOutcome::Updated(self.render())
    }

    /// Render the current page.
    pub fn render(&self) -> PageRender {
        match self.mode {
            DisplayMode::List => self.render_list(),
            DisplayMode::Screenshot => self.render_screenshot(),
        }
    }

    /// Final render with both controls disabled.
    pub fn render_inert(&self) -> PageRender {
        let mut render = self.render();
        render.prev_enabled = false;
        render.next_enabled = false;
        render
    }

    fn page_bounds(&self) -> (usize, usize) {
        let start = self.page * self.page_size;
        let end = (start + self.page_size).min(self.matches.len());
        (start, end.max(start))
    }

    fn prev_enabled(&self) -> bool {
        self.page > 0
    }

    fn next_enabled(&self) -> bool {
        self.page + 1 < self.total_pages()
    }

    fn footer(&self) -> String {
        format!("Page {}/{} | Query: {}", self.page + 1, self.total_pages(), self.query)
    }

    fn render_list(&self) -> PageRender {
        let (start, end) = self.page_bounds();
        let current = &self.matches[start.min(self.matches.len())..end];

        let sample_ip = current.first().map_or("page", |m| m.ip());
        let raw = bundle_raw_data(
            current,
            start,
            &format!("{}_{}-{}", sample_ip, start + 1, end),
            RAW_DATA_CEILING,
        );

        let mut rows = Vec::with_capacity(current.len());
        for (offset, m) in current.iter().enumerate() {
            let idx = start + offset + 1;
            let mut row = format!(
                "**{idx}.** [`{ip}:{port}`]({HOST_PAGE_URL}/{ip}) | {org}, {product}\n\
                 ASN: {asn} | {country}/{region}\n\
                 Hostnames: {hostnames}\nDomains: {domains}\n",
                ip = m.ip(),
                port = m.port_display(),
                org = m.org_display(),
                product = m.product_display(),
                asn = m.asn_display(),
                country = m.country_display(),
                region = m.region_display(),
                hostnames = safe_join(&m.hostnames, 3),
                domains = safe_join(&m.domains, 3),
            );
            if let Some(bundle) = &raw
                && m.banner().is_some()
            {
                row.push_str(&format!("[Download raw data](attachment://{})\n", bundle.filename));
            }
            rows.push(row);
        }

        let description = if rows.is_empty() {
            "No results.".into()
        } else {
            truncate_chars(&rows.join("\n"), DESCRIPTION_CEILING)
        };

        PageRender {
            title: format!(
                "Shodan Results ({}-{} of {})",
                (start + 1).min(self.matches.len().max(1)),
                end,
                self.matches.len()
            ),
            description,
            footer: self.footer(),
            image: None,
            raw,
            prev_enabled: self.prev_enabled(),
            next_enabled: self.next_enabled(),
        }
    }

    fn render_screenshot(&self) -> PageRender {
        let (start, end) = self.page_bounds();
        let Some(m) = self.matches[start.min(self.matches.len())..end].first() else {
            return PageRender {
                title: "Shodan".into(),
                description: "No screenshot results on this page.".into(),
                footer: self.footer(),
                image: None,
                raw: None,
                prev_enabled: self.prev_enabled(),
                next_enabled: self.next_enabled(),
            };
        };

        let Some((bytes, ext)) = m.decode_screenshot() else {
            return PageRender {
                title: "Shodan".into(),
                description: "Failed to decode screenshot.".into(),
                footer: self.footer(),
                image: None,
                raw: None,
                prev_enabled: self.prev_enabled(),
                next_enabled: self.next_enabled(),
            };
        };

        let filename = format!(
            "shodan_{}_{}.{ext}",
            sanitize_filename(m.filename_hint()),
            start + 1
        );

        let raw = m.banner().is_some().then(|| {
            bundle_raw_data(
                std::slice::from_ref(m),
                start,
                &format!("{}_{}", m.ip(), m.port_display()),
                RAW_DATA_CEILING,
            )
        }).flatten();

        let datalink = raw
            .as_ref()
            .map(|b| format!("[Download raw data](attachment://{})\n", b.filename))
            .unwrap_or_default();

        PageRender {
            title: format!("Shodan Screenshot {} of {}", start + 1, self.matches.len()),
            description: format!(
                "Query: `{query}`\n[`{ip}:{port}`]({HOST_PAGE_URL}/{ip}) | {org}\n\
                 Product: {product} | Transport: {transport}\n\
                 ASN: {asn} | {country}/{region}\n\
                 Hostnames: {hostnames}\nDomains: {domains}\n{datalink}",
                query = self.query,
                ip = m.ip(),
                port = m.port_display(),
                org = m.org_display(),
                product = m.product_display(),
                transport = m.transport_display(),
                asn = m.asn_display(),
                country = m.country_display(),
                region = m.region_display(),
                hostnames = safe_join(&m.hostnames, 3),
                domains = safe_join(&m.domains, 3),
            ),
            footer: format!(
                "Seen: {} | Page {}/{}",
                m.timestamp_display(),
                self.page + 1,
                self.total_pages()
            ),
            image: Some(PageImage { filename, bytes }),
            raw,
            prev_enabled: self.prev_enabled(),
            next_enabled: self.next_enabled(),
        }
    }
}

/// Concatenate the raw banners of `matches` into one capped attachment.
/// Indexes in the headers are 1-based positions in the full result list.
fn bundle_raw_data(
    matches: &[HostMatch],
    start_idx: usize,
    base_filename: &str,
    cap: usize,
) -> Option<RawBundle> {
    let mut sections = Vec::new();
    for (offset, m) in matches.iter().enumerate() {
        if let Some(banner) = m.banner() {
            sections.push(format!(
                "========== [{}] {}:{} ==========\n{}\n",
                start_idx + offset + 1,
                m.ip(),
                m.port_display(),
                banner
            ));
        }
    }
    if sections.is_empty() {
        return None;
    }

    let mut bytes = sections.join("\n").into_bytes();
    if bytes.len() > cap {
        bytes.truncate(cap);
        bytes.extend_from_slice(TRUNCATION_MARKER.as_bytes());
    }

    Some(RawBundle {
        filename: format!("{}_raw_data.txt", sanitize_filename(base_filename)),
        bytes,
    })
}

fn sanitize_filename(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Truncate to at most `ceiling` characters on a char boundary.
fn truncate_chars(s: &str, ceiling: usize) -> String {
    if s.chars().count() <= ceiling {
        return s.to_string();
    }
    s.chars().take(ceiling).collect()
}

/// Process-scoped registry of live views, keyed by the message that hosts
/// them. Mutations are single lock acquisitions, never held across awaits.
#[derive(Default)]
pub struct ViewRegistry {
    views: Mutex<HashMap<u64, PagedView>>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self { views: Mutex::new(HashMap::new()) }
    }

    /// Track a view under its host message ID, reaping idled-out entries.
    pub fn insert(&self, message_id: u64, view: PagedView) {
        let mut views = self.views.lock().unwrap();
        views.retain(|_, v| !v.is_expired());
        views.insert(message_id, view);
    }

    /// Navigate the view hosted by `message_id`. Returns `None` for unknown
    /// messages (view lost to a restart or already reaped). An `Expired`
    /// outcome removes the view.
    pub fn navigate(&self, message_id: u64, actor: u64, direction: Direction) -> Option<NavOutcome> {
        let mut views = self.views.lock().unwrap();
        let view = views.get_mut(&message_id)?;
        let outcome = view.advance(actor, direction);
        if matches!(outcome, NavOutcome::Expired(_)) {
            views.remove(&message_id);
        }
        Some(outcome)
    }

    pub fn len(&self) -> usize {
        self.views.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every view. Called on shutdown.
    pub fn clear(&self) {
        self.views.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Direction, DisplayMode, NavOutcome, PagedView, ViewRegistry, bundle_raw_data,
    };
    use crate::backends::shodan::{HostMatch, Screenshot};
    use std::time::Duration;

    fn match_with(ip: &str, port: u32, banner: Option<&str>) -> HostMatch {
        HostMatch {
            ip_str: Some(ip.into()),
            port: Some(port),
            data: banner.map(String::from),
            ..HostMatch::default()
        }
    }

    fn list_view(count: usize, page_size: usize) -> PagedView {
        let matches = (0..count)
            .map(|i| match_with(&format!("192.0.2.{i}"), 80, Some("banner")))
            .collect();
        PagedView::new(7, matches, page_size, DisplayMode::List, "test query")
    }

    #[test]
    fn page_math_and_boundary_controls() {
        let mut view = list_view(25, 10);
        assert_eq!(view.total_pages(), 3);

        let render = view.render();
        assert!(!render.prev_enabled);
        assert!(render.next_enabled);

        assert!(matches!(view.advance(7, Direction::Next), NavOutcome::Updated(_)));
        assert!(matches!(view.advance(7, Direction::Next), NavOutcome::Updated(_)));
        assert_eq!(view.current_page(), 2);

        let render = view.render();
        assert!(render.prev_enabled);
        assert!(!render.next_enabled);
    }

    #[test]
    fn empty_result_list_still_has_one_page() {
        let view = PagedView::new(7, Vec::new(), 10, DisplayMode::List, "q");
        assert_eq!(view.total_pages(), 1);
        let render = view.render();
        assert_eq!(render.description, "No results.");
        assert!(!render.prev_enabled);
        assert!(!render.next_enabled);
    }

    #[test]
    fn navigation_requires_the_original_requester() {
        let mut view = list_view(25, 10);
        let outcome = view.advance(999, Direction::Next);
        assert!(matches!(outcome, NavOutcome::Unauthorized));
        assert_eq!(view.current_page(), 0);
    }

    #[test]
    fn idle_view_goes_inert() {
        let mut view = list_view(25, 10).with_idle_timeout(Duration::ZERO);
        match view.advance(7, Direction::Next) {
            NavOutcome::Expired(render) => {
                assert!(!render.prev_enabled);
                assert!(!render.next_enabled);
            }
            other => panic!("expected expiry, got {other:?}"),
        }
        assert_eq!(view.current_page(), 0);
    }

    #[test]
    fn advance_clamps_at_boundaries() {
        let mut view = list_view(15, 10);
        assert!(matches!(view.advance(7, Direction::Previous), NavOutcome::Updated(_)));
        assert_eq!(view.current_page(), 0);
        view.advance(7, Direction::Next);
        view.advance(7, Direction::Next);
        assert_eq!(view.current_page(), 1);
    }

    #[test]
    fn list_page_bundles_raw_data_per_page() {
        let view = list_view(3, 10);
        let render = view.render();
        let bundle = render.raw.expect("bundle should exist");
        let text = String::from_utf8(bundle.bytes).unwrap();
        assert!(text.contains("========== [1] 192.0.2.0:80 =========="));
        assert!(text.contains("========== [3] 192.0.2.2:80 =========="));
        assert!(render.description.contains(&format!("attachment://{}", bundle.filename)));
    }

    #[test]
    fn raw_bundle_truncates_at_ceiling() {
        let long_banner = "x".repeat(256);
        let matches = vec![match_with("192.0.2.1", 80, Some(long_banner.as_str()))];
        let bundle = bundle_raw_data(&matches, 0, "test", 64).unwrap();
        let text = String::from_utf8(bundle.bytes).unwrap();
        assert!(text.ends_with("... (truncated)\n"));
        assert!(text.len() < 256);
    }

    #[test]
    fn bannerless_page_has_no_bundle() {
        let matches = vec![match_with("192.0.2.1", 80, None)];
        assert!(bundle_raw_data(&matches, 0, "test", 64).is_none());
    }

    #[test]
    fn screenshot_mode_renders_one_record_with_image() {
        // "aGVsbG8=" is base64 for "hello".
        let mut m = match_with("192.0.2.1", 443, Some("HTTP/1.1 200 OK"));
        m.screenshot = Some(Screenshot {
            data: Some("aGVsbG8=".into()),
            mime: Some("image/png".into()),
        });
        let view = PagedView::new(7, vec![m], 1, DisplayMode::Screenshot, "q");
        let render = view.render();
        let image = render.image.expect("image should be attached");
        assert_eq!(image.bytes, b"hello");
        assert!(image.filename.ends_with(".png"));
        assert!(render.raw.is_some());
        assert!(render.title.starts_with("Shodan Screenshot 1 of 1"));
    }

    #[test]
    fn out_of_range_screenshot_page_renders_placeholder() {
        let view = PagedView::new(7, Vec::new(), 1, DisplayMode::Screenshot, "q");
        let render = view.render();
        assert_eq!(render.description, "No screenshot results on this page.");
        assert!(render.image.is_none());
    }

    #[test]
    fn registry_navigates_and_reaps_expired_views() {
        let registry = ViewRegistry::new();
        registry.insert(100, list_view(25, 10));
        assert_eq!(registry.len(), 1);

        assert!(registry.navigate(200, 7, Direction::Next).is_none());

        match registry.navigate(100, 7, Direction::Next) {
            Some(NavOutcome::Updated(render)) => assert!(render.prev_enabled),
            other => panic!("expected update, got {other:?}"),
        }

        registry.insert(101, list_view(5, 10).with_idle_timeout(Duration::ZERO));
        match registry.navigate(101, 7, Direction::Next) {
            Some(NavOutcome::Expired(_)) => {}
            other => panic!("expected expiry, got {other:?}"),
        }
        assert!(registry.navigate(101, 7, Direction::Next).is_none());

        registry.clear();
        assert!(registry.is_empty());
    }
}
