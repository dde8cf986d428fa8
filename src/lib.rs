//! Headless article widgets for statically rendered blog pages.
//!
//! `scrollmark` models a rendered article as a [`Document`] arena plus a
//! [`Viewport`], and drives four small reading aids over it:
//!
//! - [`ScrollSpy`]: marks the table-of-contents entry for the heading
//!   nearest the top of the viewport, recomputed at most once per frame.
//! - [`FootnotePreview`]: floating previews of footnote bodies while a
//!   reference has pointer focus.
//! - [`ImageZoomDialog`]: modal zoom for article images, cloned on click or
//!   pre-rendered at build time.
//! - [`ProgressBar`]: reading progress driven by scroll position.
//!
//! Browser events are delivered to a [`Page`] as [`PageEvent`] values.
//!
//! ```rust
//! use scrollmark::{parse_html, Page, PageEvent, PageOptions, Rect, Viewport};
//!
//! # fn example() -> Result<(), scrollmark::ScrollmarkError> {
//! let mut doc = parse_html(br##"<html><body>
//!   <nav class="toc"><ol><li><a href="#intro">Intro</a></li></ol></nav>
//!   <h2><a class="header-anchor" href="#intro">Intro</a></h2>
//! </body></html>"##)?;
//! if let Some(anchor) = doc.elements_by_class("header-anchor").first().copied() {
//!     doc.set_layout(anchor, Rect::new(0.0, 120.0, 300.0, 24.0));
//! }
//!
//! let mut page = Page::load(doc, Viewport::new(800.0, 600.0), PageOptions::default());
//! page.dispatch(PageEvent::Scroll { y: 100.0 });
//! page.dispatch(PageEvent::AnimationFrame);
//! assert_eq!(page.current_toc_href(), Some("#intro"));
//! # Ok(())
//! # }
//! ```

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

pub mod coalesce;
pub mod dom;
pub mod error;
pub mod focus;
pub mod footnotes;
pub mod geometry;
pub mod html;
pub mod markup;
pub mod page;
pub mod progress;
pub mod scroll_spy;
pub mod toc;
pub mod zoom;

pub use coalesce::{Coalescer, Schedule};
pub use dom::{Document, NodeId};
pub use error::ScrollmarkError;
pub use focus::{FocusChange, FocusTracker, Modality, PointerInput};
pub use footnotes::{FootnoteOptions, FootnotePair, FootnotePreview, PairingMode};
pub use geometry::{Point, Rect, Viewport};
pub use html::{parse_html, parse_html_with_limits, HtmlLimits};
pub use markup::MarkupOptions;
pub use page::{Page, PageEvent, PageOptions};
pub use progress::{scroll_fraction, ProgressBar, ProgressOptions};
pub use scroll_spy::{ScrollSpy, ScrollSpyOptions};
pub use toc::{fragment_key, TocEntry, TocIndex};
pub use zoom::{ImageZoomDialog, ZoomOptions, ZoomVariant};
