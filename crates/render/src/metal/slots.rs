use crate::error::RenderError;
use crate::vocabulary::Vocabulary;
use std::collections::HashMap;
use zpt_dom::{Document, NodeId};

/// `fill-slot` elements by slot name.
pub(crate) type SlotFillers = HashMap<String, NodeId>;

/// Collects the `fill-slot` elements beneath `caller`, in document order.
///
/// The search does not descend into nested `use-macro`/`extend-macro`
/// elements, whose fillers belong to that nested call, nor into a filler once
/// found. When a name is filled twice the first filler wins.
pub(crate) fn collect_fillers(doc: &Document, caller: NodeId, vocab: &Vocabulary) -> SlotFillers {
    let mut fillers = SlotFillers::new();
    let mut open: Vec<NodeId> = doc.children(caller).iter().rev().copied().collect();
    while let Some(node) = open.pop() {
        if !doc.is_element(node) {
            continue;
        }
        if let Some(name) = doc.attribute(node, &vocab.fill_slot) {
            let name = name.trim().to_string();
            if fillers.contains_key(&name) {
                log::warn!("Slot '{}' is filled more than once; keeping the first", name);
            } else {
                fillers.insert(name, node);
            }
            continue;
        }
        if doc.has_attribute(node, &vocab.use_macro) || doc.has_attribute(node, &vocab.extend_macro) {
            continue;
        }
        open.extend(doc.children(node).iter().rev().copied());
    }
    fillers
}

/// Replaces each `define-slot` element beneath `root` with a copy of the
/// filler of the same name. Every slot of that name gets its own copy; the
/// filler is consumed once all of them are filled, so an extended base macro
/// sees only the names this layer left open. Slots without a filler keep the
/// macro's default content.
///
/// A slot that is itself a `fill-slot` passes its name on to the copy, so a
/// layered macro can re-expose a slot of the macro it extends.
pub(crate) fn fill_slots(
    doc: &mut Document,
    root: NodeId,
    fillers: &mut SlotFillers,
    vocab: &Vocabulary,
) -> Result<(), RenderError> {
    let slots: Vec<NodeId> = doc
        .descendants(root)
        .into_iter()
        .skip(1)
        .filter(|&node| doc.has_attribute(node, &vocab.define_slot))
        .collect();

    let mut used = Vec::new();
    for slot in slots {
        // Slots nested in an already filled slot went away with it.
        if !doc.is_ancestor_or_self(root, slot) {
            continue;
        }
        let Some(name) = doc.attribute(slot, &vocab.define_slot).map(|n| n.trim().to_string())
        else {
            continue;
        };
        let Some(&filler) = fillers.get(&name) else {
            log::trace!("Slot '{}' keeps its default content", name);
            continue;
        };
        log::trace!("Filling slot '{}'", name);
        used.push(name);

        let copy = doc.deep_copy(filler);
        doc.remove_attribute(copy, &vocab.fill_slot);
        if let Some(exposed) = doc.attribute(slot, &vocab.fill_slot).map(str::to_string) {
            doc.set_attribute(copy, vocab.fill_slot.qname(), exposed);
        }
        doc.replace_with(slot, &[copy])?;
    }
    for name in used {
        fillers.remove(&name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zpt_dom::parse_document;

    const NS: &str = r#"xmlns:metal="http://xml.zope.org/namespaces/metal""#;

    fn local_name(doc: &Document, node: NodeId) -> String {
        doc.element(node).unwrap().name.local.clone()
    }

    #[test]
    fn collects_fillers_outside_nested_calls() {
        let markup = format!(
            r#"<caller {NS}><a metal:fill-slot="one"><b metal:fill-slot="inner"/></a><c metal:use-macro="x"><d metal:fill-slot="two"/></c><e><f metal:fill-slot="three"/><g metal:fill-slot="one"/></e></caller>"#
        );
        let doc = parse_document(&markup, None).unwrap();
        let caller = doc.document_element().unwrap();
        let fillers = collect_fillers(&doc, caller, &Vocabulary::default());

        let mut names: Vec<_> = fillers.keys().cloned().collect();
        names.sort();
        assert_eq!(names, vec!["one", "three"]);
        assert_eq!(local_name(&doc, fillers["one"]), "a");
        assert_eq!(local_name(&doc, fillers["three"]), "f");
    }

    #[test]
    fn fills_matching_slots_and_keeps_defaults() {
        let markup = format!(
            r#"<root {NS}><m><h metal:define-slot="title">Default</h><p metal:define-slot="body">Default</p></m><x metal:fill-slot="body" class="f">Filled</x></root>"#
        );
        let mut doc = parse_document(&markup, None).unwrap();
        let root = doc.document_element().unwrap();
        let (macro_root, filler) = (doc.children(root)[0], doc.children(root)[1]);
        let vocab = Vocabulary::default();
        let mut fillers = SlotFillers::from([("body".to_string(), filler)]);

        fill_slots(&mut doc, macro_root, &mut fillers, &vocab).unwrap();

        assert!(fillers.is_empty());
        let children = doc.children(macro_root).to_vec();
        assert_eq!(local_name(&doc, children[0]), "h");
        assert_eq!(local_name(&doc, children[1]), "x");
        assert!(!doc.has_attribute(children[1], &vocab.fill_slot));
        assert_eq!(doc.text_content(children[1]), "Filled");
    }

    #[test]
    fn slots_declared_twice_are_both_filled() {
        let markup = format!(
            r#"<root {NS}><m><a metal:define-slot="s">d1</a><u metal:define-slot="t">d2</u><c metal:define-slot="s">d3</c></m><em metal:fill-slot="s">F</em></root>"#
        );
        let mut doc = parse_document(&markup, None).unwrap();
        let root = doc.document_element().unwrap();
        let (macro_root, filler) = (doc.children(root)[0], doc.children(root)[1]);
        let vocab = Vocabulary::default();
        let mut fillers = SlotFillers::from([("s".to_string(), filler)]);

        fill_slots(&mut doc, macro_root, &mut fillers, &vocab).unwrap();

        assert!(fillers.is_empty());
        let names: Vec<_> = doc
            .children(macro_root)
            .iter()
            .map(|&child| local_name(&doc, child))
            .collect();
        assert_eq!(names, vec!["em", "u", "em"]);
        assert_eq!(doc.text_content(macro_root), "Fd2F");
    }

    #[test]
    fn re_exposed_slots_keep_their_fill_slot_name() {
        let markup = format!(
            r#"<root {NS}><m><s metal:fill-slot="outer" metal:define-slot="inner"/></m><x metal:fill-slot="inner"/></root>"#
        );
        let mut doc = parse_document(&markup, None).unwrap();
        let root = doc.document_element().unwrap();
        let (macro_root, filler) = (doc.children(root)[0], doc.children(root)[1]);
        let vocab = Vocabulary::default();
        let mut fillers = SlotFillers::from([("inner".to_string(), filler)]);

        fill_slots(&mut doc, macro_root, &mut fillers, &vocab).unwrap();

        let copy = doc.children(macro_root)[0];
        assert_eq!(local_name(&doc, copy), "x");
        assert_eq!(doc.attribute(copy, &vocab.fill_slot), Some("outer"));
    }
}
