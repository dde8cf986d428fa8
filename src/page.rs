//! One loaded article page and the routing of browser events to its
//! widgets.

use crate::dom::{Document, NodeId};
use crate::focus::PointerInput;
use crate::footnotes::{FootnoteOptions, FootnotePreview};
use crate::geometry::{Point, Viewport};
use crate::progress::{ProgressBar, ProgressOptions};
use crate::scroll_spy::{ScrollSpy, ScrollSpyOptions};
use crate::zoom::{ImageZoomDialog, ZoomOptions};

/// Per-widget options and switches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageOptions {
    pub scroll_spy: ScrollSpyOptions,
    pub footnotes: FootnoteOptions,
    pub zoom: ZoomOptions,
    pub progress: ProgressOptions,
    pub enable_scroll_spy: bool,
    pub enable_footnotes: bool,
    pub enable_zoom: bool,
    pub enable_progress: bool,
    /// URL fragment the page was opened with, e.g. `#fn2`.
    pub initial_fragment: Option<String>,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            scroll_spy: ScrollSpyOptions::default(),
            footnotes: FootnoteOptions::default(),
            zoom: ZoomOptions::default(),
            progress: ProgressOptions::default(),
            enable_scroll_spy: true,
            enable_footnotes: true,
            enable_zoom: true,
            enable_progress: true,
            initial_fragment: None,
        }
    }
}

/// Browser events, as delivered by the host.
#[derive(Clone, Debug, PartialEq)]
pub enum PageEvent {
    /// Window scrolled to `y`.
    Scroll { y: f64 },
    /// The frame requested through [`Page::needs_animation_frame`].
    AnimationFrame,
    Resize { width: f64, height: f64 },
    PointerEnter { target: NodeId },
    PointerLeave { target: NodeId },
    Tap { target: NodeId },
    /// Click at client coordinates `x`, `y`.
    Click { target: NodeId, x: f64, y: f64 },
    TransitionEnd { target: NodeId },
    HashChange { fragment: String },
}

pub struct Page {
    doc: Document,
    viewport: Viewport,
    scroll_spy: Option<ScrollSpy>,
    footnotes: Option<FootnotePreview>,
    zoom: Option<ImageZoomDialog>,
    progress: Option<ProgressBar>,
}

impl Page {
    /// Attach every enabled widget to `doc`.
    pub fn load(mut doc: Document, viewport: Viewport, options: PageOptions) -> Self {
        let footnotes = options
            .enable_footnotes
            .then(|| FootnotePreview::attach(&mut doc, options.footnotes))
            .filter(|fp| !fp.is_empty());
        if let (Some(fp), Some(fragment)) =
            (footnotes.as_ref(), options.initial_fragment.as_deref())
        {
            fp.select_for_hash(&mut doc, fragment);
        }
        let zoom = options
            .enable_zoom
            .then(|| ImageZoomDialog::attach(&doc, options.zoom))
            .filter(|z| z.trigger_count() > 0);
        let progress = options
            .enable_progress
            .then(|| ProgressBar::attach(&doc, options.progress))
            .filter(|p| !p.is_empty());
        let scroll_spy = if options.enable_scroll_spy {
            ScrollSpy::attach(&doc, &viewport, options.scroll_spy)
        } else {
            None
        };
        log::debug!(
            "page loaded: scroll_spy={} footnotes={} zoom={} progress={}",
            scroll_spy.is_some(),
            footnotes.as_ref().map_or(0, FootnotePreview::len),
            zoom.as_ref().map_or(0, ImageZoomDialog::trigger_count),
            progress.as_ref().map_or(0, |p| p.bars().len()),
        );
        Self {
            doc,
            viewport,
            scroll_spy,
            footnotes,
            zoom,
            progress,
        }
    }

    /// Route one event. Events aimed at nodes no widget owns are ignored.
    pub fn dispatch(&mut self, event: PageEvent) {
        match event {
            PageEvent::Scroll { y } => {
                self.viewport.scroll_y = y;
                if let Some(spy) = self.scroll_spy.as_mut() {
                    spy.on_scroll(y);
                }
                self.update_progress();
            }
            PageEvent::AnimationFrame => {
                if let Some(spy) = self.scroll_spy.as_mut() {
                    spy.on_frame(&mut self.doc, &self.viewport);
                }
            }
            PageEvent::Resize { width, height } => {
                self.viewport.width = width;
                self.viewport.height = height;
                if let Some(spy) = self.scroll_spy.as_mut() {
                    spy.on_scroll(self.viewport.scroll_y);
                }
                self.update_progress();
            }
            PageEvent::PointerEnter { target } => self.pointer(target, PointerInput::Enter),
            PageEvent::PointerLeave { target } => self.pointer(target, PointerInput::Leave),
            PageEvent::Tap { target } => self.pointer(target, PointerInput::Tap),
            PageEvent::Click { target, x, y } => self.click(target, Point::new(x, y)),
            PageEvent::TransitionEnd { target } => {
                let handled = self
                    .footnotes
                    .as_mut()
                    .is_some_and(|fp| fp.on_transition_end(&mut self.doc, target));
                if !handled {
                    log::debug!("transition end on {:?} ignored", target);
                }
            }
            PageEvent::HashChange { fragment } => {
                if let Some(fp) = self.footnotes.as_ref() {
                    fp.select_for_hash(&mut self.doc, &fragment);
                }
            }
        }
    }

    /// Whether the host should deliver a [`PageEvent::AnimationFrame`].
    pub fn needs_animation_frame(&self) -> bool {
        self.scroll_spy.as_ref().is_some_and(ScrollSpy::needs_frame)
    }

    /// Height of the scrollable page: the body box when laid out, otherwise
    /// the lowest layout edge.
    pub fn document_height(&self) -> f64 {
        self.doc
            .body()
            .and_then(|body| self.doc.layout(body))
            .map(|rect| rect.bottom())
            .unwrap_or_else(|| self.doc.content_bottom())
    }

    pub fn current_toc_href(&self) -> Option<&str> {
        self.scroll_spy.as_ref().and_then(ScrollSpy::current_href)
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn scroll_spy(&self) -> Option<&ScrollSpy> {
        self.scroll_spy.as_ref()
    }

    pub fn footnotes(&self) -> Option<&FootnotePreview> {
        self.footnotes.as_ref()
    }

    pub fn zoom(&self) -> Option<&ImageZoomDialog> {
        self.zoom.as_ref()
    }

    pub fn progress(&self) -> Option<&ProgressBar> {
        self.progress.as_ref()
    }

    fn update_progress(&mut self) {
        let height = self.document_height();
        if let Some(bar) = self.progress.as_ref() {
            bar.on_scroll(&mut self.doc, &self.viewport, height);
        }
    }

    fn pointer(&mut self, target: NodeId, input: PointerInput) {
        let Some(fp) = self.footnotes.as_mut() else {
            return;
        };
        let slot = self
            .doc
            .ancestors_inclusive(target)
            .into_iter()
            .find_map(|node| fp.slot_for_reference(node));
        match slot {
            Some(i) => {
                fp.on_pointer(&mut self.doc, &self.viewport, i, input);
            }
            None => log::trace!("{:?} on {:?} is not a footnote reference", input, target),
        }
    }

    fn click(&mut self, target: NodeId, point: Point) {
        let Some(zoom) = self.zoom.as_mut() else {
            return;
        };
        if let Some(dialog) = zoom.open_dialog() {
            // With a modal open every click lands in the dialog; anything
            // outside it is the backdrop.
            let receiver = if self.doc.contains(dialog, target) {
                target
            } else {
                dialog
            };
            zoom.on_dialog_click(&mut self.doc, &self.viewport, receiver, point);
            return;
        }
        match zoom.trigger_for(&self.doc, target) {
            Some(i) => {
                zoom.open(&mut self.doc, i);
            }
            None => log::trace!("click on {:?} outside zoom triggers", target),
        }
    }
}
