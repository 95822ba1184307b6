use crate::engine::graph::{Block, BlockKind};

/// Template labels offered for each block category, in palette order.
pub fn templates(kind: BlockKind) -> &'static [&'static str] {
    match kind {
        BlockKind::Event => &["when flag clicked", "when this sprite clicked", "when space key pressed"],
        BlockKind::Motion => &[
            "move 10 steps",
            "turn right 15 degrees",
            "turn left 15 degrees",
            "point in direction 90",
            "go to x: 0 y: 0",
            "change x by 10",
            "set x to 0",
            "change y by 10",
            "set y to 0",
            "if on edge, bounce",
        ],
        BlockKind::Looks => &[
            "say \"Hello!\" for 2 secs",
            "say \"Hello!\"",
            "think \"Hmm...\" for 2 secs",
            "think \"Hmm...\"",
            "show",
            "hide",
            "change size by 10",
            "set size to 100 %",
            "next costume",
            "switch costume to 1",
        ],
        BlockKind::Sound => &[
            "play sound pop",
            "start sound pop",
            "stop all sounds",
            "change volume by -10",
            "set volume to 100 %",
        ],
        BlockKind::Control => &["wait 1 secs", "repeat 10", "forever", "if <> then", "stop all"],
        BlockKind::Sensing => &["touching mouse-pointer?", "mouse x", "mouse y", "timer"],
        BlockKind::Operators => &["pick random 1 to 10", "join apple banana"],
        BlockKind::Variables => &[
            "set my variable to 0",
            "change my variable by 1",
            "show variable my variable",
            "hide variable my variable",
        ],
        BlockKind::CustomBlock => &["my block"],
    }
}

/// A fresh unlinked template block, or `None` past the end of the category.
pub fn template(kind: BlockKind, index: usize) -> Option<Block> {
    templates(kind).get(index).map(|label| Block::template(kind, label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::instruction::Instruction;

    #[test]
    fn every_category_has_templates() {
        for kind in BlockKind::ALL {
            assert!(!templates(kind).is_empty(), "{}", kind.name());
        }
        assert!(template(BlockKind::Motion, 999).is_none());
    }

    #[test]
    fn executable_templates_decode() {
        for kind in [BlockKind::Motion, BlockKind::Looks, BlockKind::Sound] {
            for i in 0..templates(kind).len() {
                let block = template(kind, i).unwrap();
                let decoded = Instruction::decode(block.kind, &block.label);
                assert!(!matches!(decoded, Instruction::NoOp(_)), "{}", block.label);
            }
        }
    }
}
