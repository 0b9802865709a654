// src/render/caret.rs
// =============================================================================
// Keeping the caret where the user left it across a full redraw.
//
// A redraw throws away every node, so a caret stored as "node 3, offset 2"
// means nothing afterwards. Instead we:
// 1. Convert the caret to a character offset in the visible text (snapshot)
// 2. Rebuild the display
// 3. Convert the offset back to a node position in the new tree (restore)
//
// If either step fails (the old position is gone, the text got shorter) we
// simply give up on the caret. A redraw must never fail because of it.
// =============================================================================

use super::highlight::Rendered;

/// A caret position inside a rendered tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Index into `Rendered::nodes()`
    pub node: usize,
    /// Character offset inside that node (a break is one character long)
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub focus: Position,
}

impl Selection {
    /// A plain caret: anchor and focus in the same place
    pub fn collapsed(at: Position) -> Self {
        Self {
            anchor: at,
            focus: at,
        }
    }
}

// Where the caret sits when there is no text at all
const EMPTY_NOTE: Position = Position { node: 0, offset: 0 };

impl Rendered {
    /// Character offset of a position in the visible text, if the position exists
    pub fn offset_of(&self, position: Position) -> Option<usize> {
        if self.nodes().is_empty() {
            return (position == EMPTY_NOTE).then_some(0);
        }

        let node = self.nodes().get(position.node)?;
        if position.offset > node.char_len() {
            return None;
        }

        let before: usize = self.nodes()[..position.node]
            .iter()
            .map(|n| n.char_len())
            .sum();
        Some(before + position.offset)
    }

    // Finds the node position for a character offset
    //
    // An offset sitting exactly between two nodes belongs to the earlier one,
    // like a browser caret at the end of a text run. An empty note still has
    // one place for the caret.
    pub fn position_at(&self, offset: usize) -> Option<Position> {
        if self.nodes().is_empty() {
            return (offset == 0).then_some(EMPTY_NOTE);
        }

        let mut start = 0;
        for (index, node) in self.nodes().iter().enumerate() {
            let len = node.char_len();
            if offset <= start + len {
                return Some(Position {
                    node: index,
                    offset: offset - start,
                });
            }
            start += len;
        }
        None
    }
}

/// Carries a selection from the old tree over to the rebuilt one.
///
/// Returns `None` whenever the selection cannot be mapped.
pub fn preserve_selection(old: &Rendered, selection: Selection, new: &Rendered) -> Option<Selection> {
    let anchor = old.offset_of(selection.anchor)?;
    let focus = old.offset_of(selection.focus)?;

    Some(Selection {
        anchor: new.position_at(anchor)?,
        focus: new.position_at(focus)?,
    })
}
