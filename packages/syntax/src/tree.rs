//! Arena backed syntax tree
//!
//! Stylesheet and Block nodes are ordered lists; Rule, Atrule and Declaration
//! nodes are their items. Items are linked with prev/next handles so a pass can
//! insert or remove at any position in O(1). Iteration goes through registered
//! cursors which are patched on every insert/remove, so mutating the list from
//! inside an iteration never skips or revisits unrelated items.

use crate::ast::*;
use std::ops::ControlFlow;

#[derive(Debug, Clone)]
struct Slot {
    node: Node,
    parent: Option<NodeId>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    first: Option<NodeId>,
    last: Option<NodeId>,
}

#[derive(Debug, Clone, Copy)]
struct Cursor {
    list: NodeId,
    pending: Option<NodeId>,
    reverse: bool,
}

#[derive(Debug, Clone)]
pub struct Tree {
    slots: Vec<Slot>,
    root: NodeId,
    cursors: Vec<Cursor>,
    next_scope: ScopeId,
}

impl Tree {
    /// Create a tree holding an empty stylesheet
    pub fn new() -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            root: NodeId(0),
            cursors: Vec::new(),
            next_scope: 0,
        };
        let scope = tree.new_scope();
        tree.root = tree.alloc(Node::Stylesheet(Stylesheet {
            scope,
            leading_at_rules_allowed: true,
        }));
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn new_scope(&mut self) -> ScopeId {
        self.next_scope += 1;
        self.next_scope
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Slot {
            node,
            parent: None,
            prev: None,
            next: None,
            first: None,
            last: None,
        });
        id
    }

    fn slot(&self, id: NodeId) -> &Slot {
        &self.slots[id.index()]
    }

    fn slot_mut(&mut self, id: NodeId) -> &mut Slot {
        &mut self.slots[id.index()]
    }

    // ---------------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------------

    /// Allocate an empty, detached block with a fresh scope
    pub fn new_block(&mut self, merge_averse: bool) -> NodeId {
        let scope = self.new_scope();
        self.alloc(Node::Block(Block {
            scope,
            merge_averse,
        }))
    }

    /// Allocate a detached rule owning `block`
    pub fn new_rule(
        &mut self,
        prelude: SelectorList,
        block: NodeId,
        pseudo_signature: Option<String>,
    ) -> NodeId {
        let rule = self.alloc(Node::Rule(Rule {
            prelude,
            block,
            pseudo_signature,
        }));
        self.slot_mut(block).parent = Some(rule);
        rule
    }

    /// Allocate a detached at-rule, optionally owning `block`
    pub fn new_atrule(
        &mut self,
        name: impl Into<String>,
        prelude: Option<String>,
        block: Option<NodeId>,
    ) -> NodeId {
        let atrule = self.alloc(Node::Atrule(Atrule {
            name: name.into(),
            prelude,
            block,
        }));
        if let Some(block) = block {
            self.slot_mut(block).parent = Some(atrule);
        }
        atrule
    }

    pub fn new_declaration(&mut self, declaration: Declaration) -> NodeId {
        self.alloc(Node::Declaration(declaration))
    }

    /// Deep copy of a block and all of its items; the copy is detached
    pub fn clone_block(&mut self, block: NodeId) -> NodeId {
        let merge_averse = self.block(block).map(|b| b.merge_averse).unwrap_or(false);
        let copy = self.new_block(merge_averse);
        for child in self.children(block) {
            let cloned = self.clone_item(child);
            self.append(copy, cloned);
        }
        copy
    }

    fn clone_item(&mut self, item: NodeId) -> NodeId {
        match self.node(item).clone() {
            Node::Declaration(declaration) => self.new_declaration(declaration),
            Node::Rule(rule) => {
                let block = self.clone_block(rule.block);
                self.new_rule(rule.prelude, block, rule.pseudo_signature)
            }
            Node::Atrule(atrule) => {
                let block = atrule.block.map(|b| self.clone_block(b));
                self.new_atrule(atrule.name, atrule.prelude, block)
            }
            Node::Block(_) => self.clone_block(item),
            Node::Stylesheet(_) => item,
        }
    }

    // ---------------------------------------------------------------------
    // Access
    // ---------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> &Node {
        &self.slot(id).node
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.slot_mut(id).node
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind()
    }

    pub fn rule(&self, id: NodeId) -> Option<&Rule> {
        match self.node(id) {
            Node::Rule(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn rule_mut(&mut self, id: NodeId) -> Option<&mut Rule> {
        match self.node_mut(id) {
            Node::Rule(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn atrule(&self, id: NodeId) -> Option<&Atrule> {
        match self.node(id) {
            Node::Atrule(atrule) => Some(atrule),
            _ => None,
        }
    }

    pub fn atrule_mut(&mut self, id: NodeId) -> Option<&mut Atrule> {
        match self.node_mut(id) {
            Node::Atrule(atrule) => Some(atrule),
            _ => None,
        }
    }

    pub fn block(&self, id: NodeId) -> Option<&Block> {
        match self.node(id) {
            Node::Block(block) => Some(block),
            _ => None,
        }
    }

    pub fn block_mut(&mut self, id: NodeId) -> Option<&mut Block> {
        match self.node_mut(id) {
            Node::Block(block) => Some(block),
            _ => None,
        }
    }

    pub fn stylesheet(&self) -> &Stylesheet {
        match self.node(self.root) {
            Node::Stylesheet(sheet) => sheet,
            _ => unreachable!("tree root is always a stylesheet"),
        }
    }

    pub fn stylesheet_mut(&mut self) -> &mut Stylesheet {
        let root = self.root;
        match self.node_mut(root) {
            Node::Stylesheet(sheet) => sheet,
            _ => unreachable!("tree root is always a stylesheet"),
        }
    }

    pub fn declaration(&self, id: NodeId) -> Option<&Declaration> {
        match self.node(id) {
            Node::Declaration(declaration) => Some(declaration),
            _ => None,
        }
    }

    pub fn declaration_mut(&mut self, id: NodeId) -> Option<&mut Declaration> {
        match self.node_mut(id) {
            Node::Declaration(declaration) => Some(declaration),
            _ => None,
        }
    }

    /// Scope identity of a list container
    pub fn scope(&self, list: NodeId) -> ScopeId {
        match self.node(list) {
            Node::Stylesheet(sheet) => sheet.scope,
            Node::Block(block) => block.scope,
            _ => 0,
        }
    }

    /// Block of a rule, or of an at-rule that has one
    pub fn block_of(&self, id: NodeId) -> Option<NodeId> {
        match self.node(id) {
            Node::Rule(rule) => Some(rule.block),
            Node::Atrule(atrule) => atrule.block,
            _ => None,
        }
    }

    // ---------------------------------------------------------------------
    // Links
    // ---------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).parent
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).prev
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).next
    }

    pub fn first_child(&self, list: NodeId) -> Option<NodeId> {
        self.slot(list).first
    }

    pub fn last_child(&self, list: NodeId) -> Option<NodeId> {
        self.slot(list).last
    }

    pub fn is_empty(&self, list: NodeId) -> bool {
        self.slot(list).first.is_none()
    }

    /// Whether an item currently sits in some list
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.slot(id).parent.is_some() && self.node(id).kind() != NodeKind::Block
    }

    /// Snapshot of a list's items in order
    pub fn children(&self, list: NodeId) -> Vec<NodeId> {
        let mut items = Vec::new();
        let mut cursor = self.slot(list).first;
        while let Some(id) = cursor {
            items.push(id);
            cursor = self.slot(id).next;
        }
        items
    }

    pub fn len(&self, list: NodeId) -> usize {
        self.children(list).len()
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    pub fn append(&mut self, list: NodeId, item: NodeId) {
        self.insert_before(list, item, None);
    }

    /// Insert `item` before `before`, or at the end of `list` when `before` is `None`.
    /// An attached item is detached from its current list first.
    pub fn insert_before(&mut self, list: NodeId, item: NodeId, before: Option<NodeId>) {
        if self.is_attached(item) {
            self.detach(item);
        }

        let prev = match before {
            Some(before) => self.slot(before).prev,
            None => self.slot(list).last,
        };

        for cursor in self.cursors.iter_mut().filter(|c| c.list == list) {
            if cursor.reverse {
                if cursor.pending == prev {
                    cursor.pending = Some(item);
                }
            } else if cursor.pending == before {
                cursor.pending = Some(item);
            }
        }

        {
            let slot = self.slot_mut(item);
            slot.parent = Some(list);
            slot.prev = prev;
            slot.next = before;
        }
        match prev {
            Some(prev) => self.slot_mut(prev).next = Some(item),
            None => self.slot_mut(list).first = Some(item),
        }
        match before {
            Some(before) => self.slot_mut(before).prev = Some(item),
            None => self.slot_mut(list).last = Some(item),
        }
    }

    /// Unlink an item from its list; a detached item that is never re-inserted is dead
    pub fn detach(&mut self, item: NodeId) {
        let Some(list) = self.slot(item).parent else {
            return;
        };
        let (prev, next) = {
            let slot = self.slot(item);
            (slot.prev, slot.next)
        };

        for cursor in self.cursors.iter_mut().filter(|c| c.list == list) {
            if cursor.pending == Some(item) {
                cursor.pending = if cursor.reverse { prev } else { next };
            }
        }

        match prev {
            Some(prev) => self.slot_mut(prev).next = next,
            None => self.slot_mut(list).first = next,
        }
        match next {
            Some(next) => self.slot_mut(next).prev = prev,
            None => self.slot_mut(list).last = prev,
        }

        let slot = self.slot_mut(item);
        slot.parent = None;
        slot.prev = None;
        slot.next = None;
    }

    /// Move every item of `from` to the end of `to`, keeping their order
    pub fn append_children(&mut self, to: NodeId, from: NodeId) {
        for item in self.children(from) {
            self.append(to, item);
        }
    }

    /// Replace the content of `list` with `items` in the given order
    pub fn set_children(&mut self, list: NodeId, items: &[NodeId]) {
        for item in self.children(list) {
            self.detach(item);
        }
        for &item in items {
            self.append(list, item);
        }
    }

    // ---------------------------------------------------------------------
    // Iteration
    // ---------------------------------------------------------------------

    /// Visit items of `list` starting at `start` (inclusive), forward or backward,
    /// until the callback breaks or the list end is reached.
    pub fn iterate<F>(&mut self, list: NodeId, start: Option<NodeId>, reverse: bool, mut f: F)
    where
        F: FnMut(&mut Tree, NodeId) -> ControlFlow<()>,
    {
        let index = self.cursors.len();
        self.cursors.push(Cursor {
            list,
            pending: start,
            reverse,
        });

        while let Some(item) = self.cursors[index].pending {
            self.cursors[index].pending = if reverse {
                self.slot(item).prev
            } else {
                self.slot(item).next
            };
            if f(self, item).is_break() {
                break;
            }
        }

        self.cursors.truncate(index);
    }

    /// Visit every item of `list`
    pub fn for_each_child<F>(&mut self, list: NodeId, reverse: bool, mut f: F)
    where
        F: FnMut(&mut Tree, NodeId),
    {
        let start = if reverse {
            self.last_child(list)
        } else {
            self.first_child(list)
        };
        self.iterate(list, start, reverse, |tree, item| {
            f(tree, item);
            ControlFlow::Continue(())
        });
    }

    /// Visit the siblings before `item`, nearest first
    pub fn prev_until<F>(&mut self, item: NodeId, f: F)
    where
        F: FnMut(&mut Tree, NodeId) -> ControlFlow<()>,
    {
        if let Some(list) = self.parent(item) {
            let start = self.prev_sibling(item);
            self.iterate(list, start, true, f);
        }
    }

    /// Visit the siblings after `item`, nearest first
    pub fn next_until<F>(&mut self, item: NodeId, f: F)
    where
        F: FnMut(&mut Tree, NodeId) -> ControlFlow<()>,
    {
        if let Some(list) = self.parent(item) {
            let start = self.next_sibling(item);
            self.iterate(list, start, false, f);
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}
