//! Tree mutation.
//!
//! Every operation validates first and commits second: the incoming subtree
//! is checked for kind and hierarchy errors and its namespace scopes are
//! recomputed against the new parent before anything changes. After a
//! commit the owning document is renumbered.
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::document::{Document, clear_order};
use crate::error::TreeError;
use crate::model::NodeKind;
use crate::node::{Node, NodeData, read, write};
use crate::scope::{ElementState, NamespaceScope, collect_attributes, element_state};

type ScopePlan = Vec<(Node, ElementState)>;

fn plan_rescope(node: &Node, parent_scope: &NamespaceScope, plan: &mut ScopePlan) -> Result<(), TreeError> {
    let Some(el) = node.element_data() else { return Ok(()) };
    let raw_name = read(&el.name).qualified();
    let attributes = read(&el.attributes).clone();
    let state = element_state(&raw_name, attributes, parent_scope)?;
    let scope = state.scope.clone();
    plan.push((node.clone(), state));
    for child in node.children() {
        plan_rescope(&child, &scope, plan)?;
    }
    Ok(())
}

fn commit(plan: ScopePlan) {
    for (node, state) in plan {
        node.install_state(state);
    }
}

fn detach(node: &Node) {
    if let Some(parent) = node.parent() {
        if let Some(children) = parent.children_lock() {
            write(children).retain(|n| n != node);
        }
        node.set_parent(None);
    }
}

fn renumber_or_clear(doc: Option<Document>, node: &Node) {
    match doc {
        Some(doc) => doc.renumber(),
        None => clear_order(node),
    }
}

impl Node {
    fn container(&self) -> Result<&RwLock<Vec<Node>>, TreeError> {
        self.children_lock().ok_or(TreeError::NotAContainer(self.kind()))
    }

    fn scope_for_children(&self) -> NamespaceScope {
        self.namespace_scope().unwrap_or_default()
    }

    fn check_child(&self, child: &Node, replacing: Option<&Node>) -> Result<(), TreeError> {
        let invalid = TreeError::InvalidChild { parent: self.kind(), child: child.kind() };
        if !child.kind().is_child_kind() {
            return Err(invalid);
        }
        if child == self || self.ancestors().contains(child) {
            return Err(TreeError::HierarchyRequest);
        }
        if self.is_document() {
            match child.kind() {
                NodeKind::Text => return Err(invalid),
                NodeKind::Element => {
                    let occupied = self
                        .children()
                        .iter()
                        .any(|c| c.is_element() && c != child && Some(c) != replacing);
                    if occupied {
                        return Err(TreeError::DuplicateRootElement);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn plan_for(&self, child: &Node) -> Result<ScopePlan, TreeError> {
        let mut plan = Vec::new();
        plan_rescope(child, &self.scope_for_children(), &mut plan)?;
        Ok(plan)
    }

    fn finish_mutation(&self, previous_document: Option<Document>, moved: &Node) {
        let current = self.document();
        if let Some(prev) = previous_document.filter(|p| Some(p) != current.as_ref()) {
            prev.renumber();
        }
        renumber_or_clear(current, moved);
    }

    /// Appends `child`, moving it out of its current parent.
    pub fn append(&self, child: &Node) -> Result<(), TreeError> {
        let children = self.container()?;
        self.check_child(child, None)?;
        let plan = self.plan_for(child)?;
        let previous_document = child.document();
        detach(child);
        write(children).push(child.clone());
        child.set_parent(Some(self));
        commit(plan);
        self.finish_mutation(previous_document, child);
        Ok(())
    }

    /// Inserts `child` before position `index`. The index refers to the
    /// child list without `child` when it is already a child here.
    pub fn insert(&self, index: usize, child: &Node) -> Result<(), TreeError> {
        let children = self.container()?;
        let len = read(children).iter().filter(|n| *n != child).count();
        if index > len {
            return Err(TreeError::IndexOutOfBounds { index, len });
        }
        self.check_child(child, None)?;
        let plan = self.plan_for(child)?;
        let previous_document = child.document();
        detach(child);
        write(children).insert(index, child.clone());
        child.set_parent(Some(self));
        commit(plan);
        self.finish_mutation(previous_document, child);
        Ok(())
    }

    /// Replaces the child at `index`; the replaced node is detached.
    pub fn set_child(&self, index: usize, child: &Node) -> Result<Node, TreeError> {
        let children = self.container()?;
        let old = {
            let list = read(children);
            list.get(index).cloned().ok_or(TreeError::IndexOutOfBounds { index, len: list.len() })?
        };
        if &old == child {
            return Ok(old);
        }
        self.check_child(child, Some(&old))?;
        let plan = self.plan_for(child)?;
        let previous_document = child.document();
        detach(child);
        {
            let mut list = write(children);
            if let Some(slot) = list.iter_mut().find(|n| **n == old) {
                *slot = child.clone();
            }
        }
        old.set_parent(None);
        clear_order(&old);
        child.set_parent(Some(self));
        commit(plan);
        self.finish_mutation(previous_document, child);
        Ok(old)
    }

    /// Removes and returns the child at `index`.
    pub fn remove(&self, index: usize) -> Result<Node, TreeError> {
        let children = self.container()?;
        let removed = {
            let mut list = write(children);
            if index >= list.len() {
                return Err(TreeError::IndexOutOfBounds { index, len: list.len() });
            }
            list.remove(index)
        };
        removed.set_parent(None);
        clear_order(&removed);
        if let Some(doc) = self.document() {
            doc.renumber();
        }
        Ok(removed)
    }

    pub fn remove_child(&self, child: &Node) -> Result<(), TreeError> {
        let index = self.index_of(child).ok_or(TreeError::NotAChild)?;
        self.remove(index).map(|_| ())
    }

    /// Removes and returns the last child.
    pub fn pop(&self) -> Result<Option<Node>, TreeError> {
        let len = read(self.container()?).len();
        if len == 0 { Ok(None) } else { self.remove(len - 1).map(Some) }
    }

    /// Appends all nodes, validating every one of them before the first is
    /// attached.
    pub fn extend(&self, nodes: impl IntoIterator<Item = Node>) -> Result<(), TreeError> {
        let children = self.container()?;
        let nodes: Vec<Node> = nodes.into_iter().collect();
        let mut plans = Vec::with_capacity(nodes.len());
        for node in &nodes {
            self.check_child(node, None)?;
            if nodes.iter().filter(|n| *n == node).count() > 1 {
                return Err(TreeError::HierarchyRequest);
            }
            plans.push(self.plan_for(node)?);
        }
        if self.is_document() && nodes.iter().filter(|n| n.is_element()).count() > 1 {
            return Err(TreeError::DuplicateRootElement);
        }
        let mut previous = Vec::new();
        for (node, plan) in nodes.iter().zip(plans) {
            if let Some(doc) = node.document() {
                previous.push(doc);
            }
            detach(node);
            write(children).push(node.clone());
            node.set_parent(Some(self));
            commit(plan);
        }
        let current = self.document();
        for doc in previous.into_iter().filter(|d| Some(d) != current.as_ref()) {
            doc.renumber();
        }
        match current {
            Some(doc) => doc.renumber(),
            None => nodes.iter().for_each(clear_order),
        }
        Ok(())
    }

    pub fn reverse_children(&self) -> Result<(), TreeError> {
        write(self.container()?).reverse();
        if let Some(doc) = self.document() {
            doc.renumber();
        }
        Ok(())
    }

    /// Creates an element in this node's namespace scope and appends it.
    pub fn spawn_element<I, K, V>(&self, name: &str, attributes: I) -> Result<Node, TreeError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.container()?;
        let state = element_state(name, collect_attributes(attributes)?, &self.scope_for_children())?;
        let node = Node::element_from_state(state);
        self.append(&node)?;
        Ok(node)
    }

    pub fn spawn_character_data(&self, data: impl Into<String>) -> Result<Node, TreeError> {
        let node = Node::new_text(data);
        self.append(&node)?;
        Ok(node)
    }

    pub fn spawn_cdata(&self, data: impl Into<String>) -> Result<Node, TreeError> {
        let node = Node::new_cdata(data);
        self.append(&node)?;
        Ok(node)
    }

    pub fn spawn_comment(&self, data: impl Into<String>) -> Result<Node, TreeError> {
        let node = Node::new_comment(data);
        self.append(&node)?;
        Ok(node)
    }

    pub fn spawn_processing_instruction(
        &self,
        target: impl Into<String>,
        data: impl Into<String>,
    ) -> Result<Node, TreeError> {
        let node = Node::new_processing_instruction(target, data);
        self.append(&node)?;
        Ok(node)
    }

    /// Recomputes this element and its descendants from a new raw name and
    /// attribute map.
    fn restate(&self, raw_name: &str, attributes: BTreeMap<String, String>) -> Result<(), TreeError> {
        let parent_scope = self.parent().and_then(|p| p.namespace_scope()).unwrap_or_default();
        let state = element_state(raw_name, attributes, &parent_scope)?;
        let scope = state.scope.clone();
        let mut plan = vec![(self.clone(), state)];
        for child in self.children() {
            plan_rescope(&child, &scope, &mut plan)?;
        }
        commit(plan);
        renumber_or_clear(self.document(), self);
        Ok(())
    }

    /// Sets or replaces an attribute. Namespace declarations re-resolve the
    /// element and its descendants.
    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) -> Result<(), TreeError> {
        let el = self.element_data().ok_or(TreeError::NotAnElement(self.kind()))?;
        let mut attributes = read(&el.attributes).clone();
        attributes.insert(name.into(), value.into());
        let raw_name = read(&el.name).qualified();
        self.restate(&raw_name, attributes)
    }

    pub fn remove_attribute(&self, name: &str) -> Result<Option<String>, TreeError> {
        let el = self.element_data().ok_or(TreeError::NotAnElement(self.kind()))?;
        let mut attributes = read(&el.attributes).clone();
        let Some(old) = attributes.remove(name) else { return Ok(None) };
        let raw_name = read(&el.name).qualified();
        self.restate(&raw_name, attributes)?;
        Ok(Some(old))
    }

    /// Renames an element; the new name is resolved in its current scope.
    pub fn set_name(&self, name: &str) -> Result<(), TreeError> {
        let el = self.element_data().ok_or(TreeError::NotAnElement(self.kind()))?;
        let attributes = read(&el.attributes).clone();
        self.restate(name, attributes)
    }

    /// Replaces the value of an attribute, text, comment or processing
    /// instruction node.
    pub fn set_value(&self, value: impl Into<String>) -> Result<(), TreeError> {
        match &self.0.data {
            NodeData::Attribute(a) => match self.parent() {
                Some(owner) => owner.set_attribute(a.key.clone(), value),
                None => {
                    *write(&a.value) = value.into();
                    Ok(())
                }
            },
            NodeData::Text { data, .. } | NodeData::Comment(data) | NodeData::ProcessingInstruction { data, .. } => {
                *write(data) = value.into();
                Ok(())
            }
            _ => Err(TreeError::NoValue(self.kind())),
        }
    }
}
