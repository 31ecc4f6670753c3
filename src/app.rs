use crate::api::{Article, ArticleId, ImageBytes, ListId};
use crate::images::{BindOutcome, SlotId};
use crate::keybindings::KeybindingRegistry;
use crate::pipeline::{ListController, Pipeline, SnapshotDiff};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Number of frames in the loading spinner animation.
pub const SPINNER_FRAMES: usize = 10;

/// Status messages disappear after this many seconds.
const STATUS_TTL_SECS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Tabbed ranked lists
    List,
    /// Full-screen article detail
    Detail,
}

/// What a visible slot currently paints in its image line.
#[derive(Debug, Clone)]
pub enum SlotImage {
    None,
    Loading { generation: u64 },
    Loaded(ImageBytes),
    Failed,
}

/// Paint state of one visible slot.
#[derive(Debug, Clone)]
pub struct SlotPaint {
    pub article_id: ArticleId,
    pub image: SlotImage,
}

/// UI state of one list tab.
#[derive(Debug)]
pub struct PageState {
    pub list: ListId,
    /// Rendered rows, in committed order.
    pub articles: Vec<Arc<Article>>,
    pub selected: usize,
    /// Index of the first visible row.
    pub offset: usize,
    pub loading: bool,
    /// Last fetch error, shown inline until the next successful commit.
    pub error: Option<String>,
    pub visited: bool,
    /// Slot i shows row `offset + i`.
    pub slots: HashMap<SlotId, SlotPaint>,
}

impl PageState {
    fn new(list: ListId) -> Self {
        Self {
            list,
            articles: Vec::new(),
            selected: 0,
            offset: 0,
            loading: false,
            error: None,
            visited: false,
            slots: HashMap::new(),
        }
    }

    pub fn selected_article(&self) -> Option<&Arc<Article>> {
        self.articles.get(self.selected)
    }

    /// Replaces the rows with a committed snapshot.
    ///
    /// The selection follows the previously selected article if it survived,
    /// otherwise it is clamped to the new length.
    pub fn commit(&mut self, diff: &SnapshotDiff, articles: Vec<Arc<Article>>) {
        let old_ids: Vec<ArticleId> = self.articles.iter().map(|a| a.id).collect();
        let new_ids: Vec<ArticleId> = articles.iter().map(|a| a.id).collect();
        if diff.apply(&old_ids) != new_ids {
            tracing::warn!(list = %self.list, "Snapshot diff does not reproduce committed order");
        }

        let selected_id = self.selected_article().map(|a| a.id);
        self.articles = articles;
        self.selected = selected_id
            .and_then(|id| self.articles.iter().position(|a| a.id == id))
            .unwrap_or(self.selected)
            .min(self.articles.len().saturating_sub(1));
        self.error = None;
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.articles.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.articles.len().saturating_sub(1);
    }

    pub fn page_down(&mut self, rows: usize) {
        self.selected = (self.selected + rows.max(1)).min(self.articles.len().saturating_sub(1));
    }

    pub fn page_up(&mut self, rows: usize) {
        self.selected = self.selected.saturating_sub(rows.max(1));
    }

    /// Scrolls so the selection is inside a window of `visible` rows.
    pub fn ensure_visible(&mut self, visible: usize) {
        let visible = visible.max(1);
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + visible {
            self.offset = self.selected + 1 - visible;
        }
        let max_offset = self.articles.len().saturating_sub(visible);
        self.offset = self.offset.min(max_offset);
    }

    /// Articles currently in view, paired with their slot.
    pub fn visible(&self, visible: usize) -> impl Iterator<Item = (SlotId, &Arc<Article>)> {
        self.articles
            .iter()
            .skip(self.offset)
            .take(visible)
            .enumerate()
            .map(|(i, a)| (SlotId(i), a))
    }
}

/// Application state for the terminal UI.
pub struct App {
    pub pipeline: Arc<Pipeline>,
    pub pages: [PageState; 3],
    pub active: ListId,
    pub view: View,
    pub keybindings: KeybindingRegistry,

    /// Article shown in the detail view.
    pub detail: Option<Arc<Article>>,
    pub detail_scroll: u16,

    /// Number of list rows that fit in the list panel, updated on render.
    pub viewport_rows: usize,

    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub spinner_frame: usize,

    /// Only redraw when state changed.
    pub needs_redraw: bool,

    pub(crate) load_handles: [Option<JoinHandle<()>>; 3],
}

impl App {
    pub fn new(pipeline: Arc<Pipeline>, start: ListId) -> Self {
        Self {
            pipeline,
            pages: ListId::ALL.map(PageState::new),
            active: start,
            view: View::List,
            keybindings: KeybindingRegistry::new(),
            detail: None,
            detail_scroll: 0,
            viewport_rows: 1,
            status_message: None,
            spinner_frame: 0,
            needs_redraw: true,
            load_handles: [None, None, None],
        }
    }

    pub fn page(&self) -> &PageState {
        &self.pages[self.active.index()]
    }

    pub fn page_mut(&mut self) -> &mut PageState {
        &mut self.pages[self.active.index()]
    }

    pub fn page_for(&mut self, list: ListId) -> &mut PageState {
        &mut self.pages[list.index()]
    }

    pub fn controller(&self, list: ListId) -> &Arc<ListController> {
        self.pipeline.controller(list)
    }

    pub fn any_loading(&self) -> bool {
        self.pages.iter().any(|p| p.loading)
    }

    /// Makes `list` the active tab.
    ///
    /// Slots of the tab being left are released. Returns true if the tab is
    /// visited for the first time and needs a load.
    pub fn switch_to(&mut self, list: ListId) -> bool {
        if list != self.active {
            self.release_slots(self.active);
            self.active = list;
        }
        let page = self.page_mut();
        let first_visit = !page.visited;
        page.visited = true;
        first_visit
    }

    pub fn next_list(&self) -> ListId {
        ListId::ALL[(self.active.index() + 1) % ListId::ALL.len()]
    }

    pub fn prev_list(&self) -> ListId {
        ListId::ALL[(self.active.index() + ListId::ALL.len() - 1) % ListId::ALL.len()]
    }

    /// Binds every visible row of the active page to its slot and releases
    /// slots that no longer show a row.
    pub fn sync_slots(&mut self) {
        let list = self.active;
        let visible = self.viewport_rows;
        let controller = Arc::clone(self.pipeline.controller(list));
        let images = controller.images();
        let page = &mut self.pages[list.index()];

        let bound: Vec<(SlotId, Arc<Article>)> = page
            .visible(visible)
            .map(|(slot, a)| (slot, Arc::clone(a)))
            .collect();

        let in_view = bound.len();
        let stale: Vec<SlotId> = page
            .slots
            .keys()
            .copied()
            .filter(|slot| slot.0 >= in_view)
            .collect();
        for slot in stale {
            images.release(slot);
            page.slots.remove(&slot);
        }

        for (slot, article) in bound {
            let article_id = article.id;
            let image = match images.bind(slot, article) {
                BindOutcome::Unchanged => match page.slots.get(&slot) {
                    Some(paint) if paint.article_id == article_id => continue,
                    _ => SlotImage::None,
                },
                BindOutcome::NoImage => SlotImage::None,
                BindOutcome::Cached(bytes) => SlotImage::Loaded(bytes),
                BindOutcome::Loading { generation } => SlotImage::Loading { generation },
            };
            page.slots.insert(slot, SlotPaint { article_id, image });
        }
    }

    /// Releases all slots of `list` (tab hidden or rows replaced).
    pub fn release_slots(&mut self, list: ListId) {
        self.pipeline.controller(list).images().release_all();
        self.pages[list.index()].slots.clear();
    }

    /// Enter the detail view for the selected article.
    ///
    /// The article is resolved through the controller so the detail view
    /// sees the committed snapshot, not a stale row.
    pub fn enter_detail(&mut self) -> bool {
        let Some(id) = self.page().selected_article().map(|a| a.id) else {
            return false;
        };
        match self.controller(self.active).article(id) {
            Some(article) => {
                self.detail = Some(article);
                self.detail_scroll = 0;
                self.view = View::Detail;
                true
            }
            None => false,
        }
    }

    pub fn exit_detail(&mut self) {
        self.view = View::List;
        self.detail = None;
        self.detail_scroll = 0;
    }

    pub fn scroll_detail(&mut self, delta: i32) {
        self.detail_scroll = if delta < 0 {
            self.detail_scroll.saturating_sub(delta.unsigned_abs() as u16)
        } else {
            self.detail_scroll.saturating_add(delta as u16)
        };
    }

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Clear status message if expired.
    /// Returns true if a message was actually cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= STATUS_TTL_SECS {
                self.status_message = None;
                return true;
            }
        }
        false
    }

    pub fn advance_spinner(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES;
    }
}

impl Drop for App {
    fn drop(&mut self) {
        for handle in self.load_handles.iter_mut().filter_map(Option::take) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fixtures::article;
    use crate::config::Config;
    use crate::pipeline::diff;
    use secrecy::SecretString;
    use tokio::sync::mpsc;
    use tokio::time::{self, Duration};

    fn test_app() -> App {
        let (tx, _rx) = mpsc::channel(8);
        let pipeline = Pipeline::with_api_key(
            &Config {
                base_url: "https://api.example.com/v2".to_string(),
                ..Config::default()
            },
            SecretString::from("k".to_string()),
            tx,
        )
        .unwrap();
        App::new(Arc::new(pipeline), ListId::Emailed)
    }

    fn articles(ids: &[u64]) -> Vec<Arc<Article>> {
        ids.iter()
            .map(|&id| Arc::new(article(id, &format!("Title {id}"))))
            .collect()
    }

    fn commit(page: &mut PageState, ids: &[u64]) {
        let next = articles(ids);
        let d = diff(&page.articles, &next);
        page.commit(&d, next);
    }

    #[test]
    fn test_first_visit_detection() {
        let mut app = test_app();
        assert!(app.switch_to(ListId::Emailed));
        assert!(!app.switch_to(ListId::Emailed));
        assert!(app.switch_to(ListId::Viewed));
        assert_eq!(app.active, ListId::Viewed);
    }

    #[test]
    fn test_tab_cycling() {
        let mut app = test_app();
        assert_eq!(app.next_list(), ListId::Shared);
        assert_eq!(app.prev_list(), ListId::Viewed);
        app.active = ListId::Viewed;
        assert_eq!(app.next_list(), ListId::Emailed);
    }

    #[test]
    fn test_selection_follows_article_across_commits() {
        let mut page = PageState::new(ListId::Shared);
        commit(&mut page, &[1, 2, 3]);
        page.selected = 1;

        commit(&mut page, &[3, 1, 2]);
        assert_eq!(page.selected_article().unwrap().id, ArticleId(2));
        assert_eq!(page.selected, 2);

        commit(&mut page, &[9]);
        assert_eq!(page.selected, 0);
    }

    #[test]
    fn test_commit_clears_error() {
        let mut page = PageState::new(ListId::Shared);
        page.error = Some("HTTP error: status 500".to_string());
        commit(&mut page, &[1]);
        assert!(page.error.is_none());
    }

    #[test]
    fn test_navigation_bounds() {
        let mut page = PageState::new(ListId::Emailed);
        page.select_next();
        page.select_prev();
        assert_eq!(page.selected, 0);

        commit(&mut page, &[1, 2, 3, 4, 5, 6, 7]);
        page.select_last();
        assert_eq!(page.selected, 6);
        page.select_next();
        assert_eq!(page.selected, 6);
        page.page_up(3);
        assert_eq!(page.selected, 3);
        page.page_down(10);
        assert_eq!(page.selected, 6);
        page.select_first();
        assert_eq!(page.selected, 0);
    }

    #[test]
    fn test_ensure_visible_scrolls_window() {
        let mut page = PageState::new(ListId::Emailed);
        commit(&mut page, &[1, 2, 3, 4, 5, 6, 7]);

        page.selected = 5;
        page.ensure_visible(3);
        assert_eq!(page.offset, 3);

        let slots: Vec<_> = page.visible(3).map(|(s, a)| (s.0, a.id.0)).collect();
        assert_eq!(slots, vec![(0, 4), (1, 5), (2, 6)]);

        page.selected = 1;
        page.ensure_visible(3);
        assert_eq!(page.offset, 1);
    }

    #[tokio::test]
    async fn test_sync_slots_binds_and_releases() {
        let mut app = test_app();
        app.viewport_rows = 2;
        commit(app.page_mut(), &[1, 2, 3]);

        app.sync_slots();
        assert_eq!(app.page().slots.len(), 2);
        assert_eq!(app.page().slots[&SlotId(1)].article_id, ArticleId(2));
        assert!(matches!(app.page().slots[&SlotId(0)].image, SlotImage::None));

        app.viewport_rows = 1;
        app.sync_slots();
        assert_eq!(app.page().slots.len(), 1);
        assert_eq!(
            app.controller(ListId::Emailed).images().bound_article(SlotId(1)),
            None
        );

        app.switch_to(ListId::Shared);
        assert!(app.pages[ListId::Emailed.index()].slots.is_empty());
    }

    #[test]
    fn test_exit_detail_resets_scroll() {
        let mut app = test_app();
        app.view = View::Detail;
        app.detail_scroll = 10;
        app.exit_detail();
        assert_eq!(app.view, View::List);
        assert_eq!(app.detail_scroll, 0);
        assert!(app.detail.is_none());
    }

    #[test]
    fn test_enter_detail_requires_committed_article() {
        let mut app = test_app();
        assert!(!app.enter_detail());

        // rows present in the page but not in the controller's snapshot
        commit(app.page_mut(), &[1]);
        assert!(!app.enter_detail());
        assert_eq!(app.view, View::List);
    }

    #[tokio::test]
    async fn test_status_expires_after_3_seconds() {
        let mut app = test_app();
        time::pause();
        app.set_status("Test message");

        time::advance(Duration::from_secs(2)).await;
        assert!(!app.clear_expired_status());
        assert!(app.status_message.is_some());

        time::advance(Duration::from_secs(2)).await;
        assert!(app.clear_expired_status());
        assert!(app.status_message.is_none());
    }

    #[test]
    fn test_spinner_wraps() {
        let mut app = test_app();
        for _ in 0..SPINNER_FRAMES {
            app.advance_spinner();
        }
        assert_eq!(app.spinner_frame, 0);
    }
}
