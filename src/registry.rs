//! Page-lifetime card registry.
//!
//! Card components register their element handle on mount and drop it on
//! unmount; the engine pulls fresh bounding rectangles from the registry each
//! time it needs them. Geometry access goes through the `BoundsSource`
//! capability trait so the registry core carries no DOM coupling and the
//! whole hover path runs under native `cargo test`.

use std::collections::HashMap;

use crate::geom::Rect;

/// Anything that can report a current bounding rectangle in viewport pixels.
/// `None` means the backing element is gone (detached node).
pub trait BoundsSource {
    fn bounds(&self) -> Option<Rect>;
}

/// One registered card. The handle is a non-owning view of the element; the
/// engine only ever reads geometry through it.
pub struct CardRecord<H> {
    pub id: String,
    pub handle: H,
    pub is_blocker: bool,
    pub is_border_eraser: bool,
    pub group_id: Option<String>,
}

/// Per-frame snapshot consumed by grid classification and border drawing.
/// Cards sharing a `group_id` collapse into a single view with the union
/// rectangle, so adjacent grouped cards present one continuous border.
#[derive(Clone, Copy, Debug)]
pub struct RenderView {
    pub rect: Rect,
    pub is_blocker: bool,
    pub is_border_eraser: bool,
}

type Listener = Box<dyn FnMut()>;

pub struct CardRegistry<H: BoundsSource> {
    cards: Vec<CardRecord<H>>, // insertion order, like a JS Map
    mouse: Option<(f64, f64)>, // None until the first pointer event
    hovered: i32,
    listeners: Vec<(u64, Listener)>,
    next_token: u64,
}

impl<H: BoundsSource> Default for CardRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: BoundsSource> CardRegistry<H> {
    pub fn new() -> Self {
        Self {
            cards: Vec::new(),
            mouse: None,
            hovered: -1,
            listeners: Vec::new(),
            next_token: 0,
        }
    }

    /// Adds a card or replaces an existing one with the same id (last write
    /// wins, insertion slot preserved). Listeners fire synchronously.
    pub fn register(&mut self, record: CardRecord<H>) {
        match self.cards.iter_mut().find(|c| c.id == record.id) {
            Some(slot) => *slot = record,
            None => self.cards.push(record),
        }
        self.notify();
    }

    /// Removes a card by id. Missing ids are a silent no-op and do not
    /// disturb listeners.
    pub fn unregister(&mut self, id: &str) {
        let before = self.cards.len();
        self.cards.retain(|c| c.id != id);
        if self.cards.len() != before {
            self.notify();
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Fresh bounding rectangle per card, in insertion order. Nothing is
    /// cached here; callers own any caching policy. Detached handles report a
    /// zero rectangle so indices stay aligned with the card list.
    pub fn card_bounds(&self) -> Vec<Rect> {
        self.cards
            .iter()
            .map(|c| c.handle.bounds().unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0)))
            .collect()
    }

    /// Records the pointer position and recomputes the hovered card: first
    /// card (in insertion order) whose rectangle contains the pointer wins.
    /// Overlapping cards therefore resolve to registration order, not visual
    /// stacking order.
    pub fn update_mouse_pos(&mut self, x: f64, y: f64) {
        self.mouse = Some((x, y));
        self.hovered = self
            .card_bounds()
            .iter()
            .position(|r| r.width > 0.0 && r.height > 0.0 && r.contains(x, y))
            .map(|i| i as i32)
            .unwrap_or(-1);
    }

    /// Last known pointer position, or `None` before any pointer event.
    pub fn mouse_pos(&self) -> Option<(f64, f64)> {
        self.mouse
    }

    /// Index of the hovered card, or −1 when the pointer is over none.
    pub fn hovered_card_index(&self) -> i32 {
        self.hovered
    }

    /// Registers a change listener invoked synchronously on every register /
    /// unregister. No payload is passed; listeners re-pull whatever state
    /// they need. Returns a token for `unsubscribe`.
    pub fn subscribe(&mut self, listener: impl FnMut() + 'static) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        self.listeners.push((token, Box::new(listener)));
        token
    }

    pub fn unsubscribe(&mut self, token: u64) {
        self.listeners.retain(|(t, _)| *t != token);
    }

    fn notify(&mut self) {
        for (_, listener) in self.listeners.iter_mut() {
            listener();
        }
    }

    /// Builds the classification snapshot plus a card-index → view-index map
    /// (grouped cards share a view; detached or degenerate cards map to
    /// `None`).
    pub fn render_views(&self) -> (Vec<RenderView>, Vec<Option<usize>>) {
        let mut views: Vec<RenderView> = Vec::new();
        let mut card_to_view = Vec::with_capacity(self.cards.len());
        let mut group_slots: HashMap<&str, usize> = HashMap::new();

        for card in &self.cards {
            let rect = match card.handle.bounds() {
                Some(r) if r.width > 0.0 && r.height > 0.0 => r,
                _ => {
                    card_to_view.push(None);
                    continue;
                }
            };
            let slot = match card.group_id.as_deref() {
                Some(group) => match group_slots.get(group) {
                    Some(&i) => {
                        let view = &mut views[i];
                        view.rect = view.rect.union(&rect);
                        view.is_blocker |= card.is_blocker;
                        view.is_border_eraser |= card.is_border_eraser;
                        i
                    }
                    None => {
                        views.push(RenderView {
                            rect,
                            is_blocker: card.is_blocker,
                            is_border_eraser: card.is_border_eraser,
                        });
                        group_slots.insert(group, views.len() - 1);
                        views.len() - 1
                    }
                },
                None => {
                    views.push(RenderView {
                        rect,
                        is_blocker: card.is_blocker,
                        is_border_eraser: card.is_border_eraser,
                    });
                    views.len() - 1
                }
            };
            card_to_view.push(Some(slot));
        }
        (views, card_to_view)
    }
}

/// DOM-backed bounds source used by the wasm entry points.
pub struct DomHandle {
    element: web_sys::Element,
}

impl DomHandle {
    pub fn new(element: web_sys::Element) -> Self {
        Self { element }
    }
}

impl BoundsSource for DomHandle {
    fn bounds(&self) -> Option<Rect> {
        let r = self.element.get_bounding_client_rect();
        Some(Rect::new(r.x(), r.y(), r.width(), r.height()))
    }
}
