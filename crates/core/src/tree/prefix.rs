use super::{Attachment, InsertError, Leaf};

/// Insert a flat name into a compressed prefix tree.
pub(super) fn insert(
    root: &mut Leaf,
    full_name: &str,
    attachment: &Attachment<'_>,
) -> Result<(), InsertError> {
    if full_name.trim().is_empty() {
        return Err(InsertError::EmptyName);
    }
    insert_at(root, full_name, attachment, 0);
    Ok(())
}

/// `depth` is the depth of `node`'s children.
fn insert_at(node: &mut Leaf, name: &str, attachment: &Attachment<'_>, depth: usize) {
    node.attach(attachment);

    // Longest non-empty common prefix; the first child wins ties.
    let mut best: Option<(usize, usize)> = None;
    for (idx, child) in node.children.iter().enumerate() {
        let len = common_prefix_len(&child.full_name, name);
        if len > 0 && best.map_or(true, |(_, best_len)| len > best_len) {
            best = Some((idx, len));
        }
    }

    let Some((idx, gcp_len)) = best else {
        let mut leaf = Leaf::new(name, name, depth);
        leaf.attach(attachment);
        leaf.direct += 1;
        node.children.push(leaf);
        return;
    };
    let gcp = &name[..gcp_len];

    if node.children[idx].full_name == name || node.full_name == gcp {
        let child = &mut node.children[idx];
        child.attach(attachment);
        child.direct += 1;
        return;
    }

    if node.children[idx].full_name == gcp {
        insert_at(&mut node.children[idx], name, attachment, depth + 1);
        return;
    }

    // Partial overlap: an intermediate takes the matched child's slot.
    let mut matched = std::mem::replace(&mut node.children[idx], Leaf::new(gcp, gcp, depth));
    matched.shift_depth(1);
    let intermediate = &mut node.children[idx];
    intermediate.absorb(&matched);
    intermediate.children.push(matched);
    intermediate.attach(attachment);
    if gcp_len == name.len() {
        intermediate.direct += 1;
    } else {
        let mut leaf = Leaf::new(name, name, depth + 1);
        leaf.attach(attachment);
        leaf.direct += 1;
        intermediate.children.push(leaf);
    }
}

/// Byte length of the greatest common prefix, cut on a char boundary.
pub(crate) fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .take_while(|((_, ca), cb)| ca == cb)
        .last()
        .map_or(0, |((i, ca), _)| i + ca.len_utf8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectId;

    #[test]
    fn common_prefix_respects_char_boundaries() {
        assert_eq!(common_prefix_len("PROGA1", "PROGB2"), 4);
        assert_eq!(common_prefix_len("ABC", "XYZ"), 0);
        assert_eq!(common_prefix_len("", "ABC"), 0);
        assert_eq!(common_prefix_len("ÉTAT1", "ÉTAT2"), "ÉTAT".len());
        assert_eq!(common_prefix_len("ÉA", "ÈA"), 0);
    }

    #[test]
    fn prefix_of_existing_child_becomes_intermediate() {
        let mut root = Leaf::new("", "", 0);
        insert(&mut root, "PAYROLL", &Attachment::bare(ObjectId(1))).unwrap();
        insert(&mut root, "PAY", &Attachment::bare(ObjectId(2))).unwrap();

        assert_eq!(root.children.len(), 1);
        let pay = &root.children[0];
        assert_eq!(pay.full_name, "PAY");
        assert_eq!(pay.count, 2);
        assert_eq!(pay.direct, 1);
        assert_eq!(pay.depth, 0);
        assert_eq!(pay.children.len(), 1);
        assert_eq!(pay.children[0].full_name, "PAYROLL");
        assert_eq!(pay.children[0].depth, 1);
    }
}
