//! Tree structure rendering for bone hierarchies

use console::Style;
use mmd_pmx::Skeleton;

/// Represents a node in a tree structure
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub name: String,
    pub node_type: NodeType,
    pub children: Vec<TreeNode>,
    pub metadata: Vec<(String, String)>,
}

/// Types of nodes in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Root,
    Bone,
    /// A bone simulated by a dynamic rigidbody
    PhysicsBone,
}

/// Options for tree rendering
#[derive(Debug, Clone, Default)]
pub struct TreeOptions {
    pub max_depth: Option<usize>,
    pub no_color: bool,
    pub show_metadata: bool,
}

impl TreeNode {
    /// Create a new tree node
    pub fn new(name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            name: name.into(),
            node_type,
            children: Vec::new(),
            metadata: Vec::new(),
        }
    }

    /// Add a child node
    pub fn add_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.push((key.to_string(), value.into()));
        self
    }
}

impl NodeType {
    /// Get color style for node type
    pub fn style(self, no_color: bool) -> Style {
        if no_color {
            return Style::new();
        }
        match self {
            Self::Root => Style::new().bold().cyan(),
            Self::Bone => Style::new().green(),
            Self::PhysicsBone => Style::new().yellow(),
        }
    }
}

/// Build the bone hierarchy of a skeleton under a root node
///
/// `physics_bones[i]` marks bone `i` as driven by a dynamic rigidbody.
pub fn skeleton_tree(name: &str, skeleton: &Skeleton, physics_bones: &[bool]) -> TreeNode {
    fn build(skeleton: &Skeleton, index: usize, physics_bones: &[bool]) -> TreeNode {
        let bone = &skeleton.bones()[index];
        let node_type = if physics_bones.get(index).copied().unwrap_or(false) {
            NodeType::PhysicsBone
        } else {
            NodeType::Bone
        };
        let mut node = TreeNode::new(format!("[{}] {}", index, bone.name), node_type);
        if !bone.english_name.is_empty() {
            node = node.with_metadata("english", bone.english_name.clone());
        }
        if let Some(append) = &bone.append
            && let Some(parent) = append.parent
        {
            node = node.with_metadata("append", format!("{} × {:.2}", parent, append.ratio));
        }
        for child in skeleton.children(index) {
            node = node.add_child(build(skeleton, child, physics_bones));
        }
        node
    }

    let mut root = TreeNode::new(name, NodeType::Root)
        .with_metadata("bones", skeleton.len().to_string());
    for index in skeleton.roots() {
        root = root.add_child(build(skeleton, index, physics_bones));
    }
    root
}

/// Render a tree structure to string
pub fn render_tree(root: &TreeNode, options: &TreeOptions) -> String {
    let mut output = String::new();
    render_node(root, &mut output, "", true, 0, options);
    output
}

fn render_node(
    node: &TreeNode,
    output: &mut String,
    prefix: &str,
    is_last: bool,
    depth: usize,
    options: &TreeOptions,
) {
    if let Some(max_depth) = options.max_depth
        && depth > max_depth
    {
        return;
    }

    let style = node.node_type.style(options.no_color);
    let connector = if depth == 0 {
        ""
    } else if is_last {
        "└── "
    } else {
        "├── "
    };

    output.push_str(&format!("{}{}{}", prefix, connector, style.apply_to(&node.name)));

    if options.show_metadata && !node.metadata.is_empty() {
        let parts: Vec<String> = node
            .metadata
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect();
        output.push_str(&format!(" [{}]", parts.join(", ")));
    }
    output.push('\n');

    let child_prefix = if depth == 0 {
        String::new()
    } else {
        format!("{}{}", prefix, if is_last { "    " } else { "│   " })
    };
    for (i, child) in node.children.iter().enumerate() {
        let is_last_child = i == node.children.len() - 1;
        render_node(child, output, &child_prefix, is_last_child, depth + 1, options);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use mmd_pmx::Bone;

    fn skeleton() -> Skeleton {
        Skeleton::new(vec![
            Bone::new("root", Vec3::ZERO, None),
            Bone::new("arm", Vec3::Y, Some(0)),
            Bone::new("hair", Vec3::new(0.0, 2.0, 0.0), Some(0)),
        ])
        .unwrap()
    }

    #[test]
    fn test_skeleton_tree_rendering() {
        let tree = skeleton_tree("model.pmx", &skeleton(), &[false, false, true]);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].children.len(), 2);
        assert_eq!(tree.children[0].children[1].node_type, NodeType::PhysicsBone);

        let options = TreeOptions {
            no_color: true,
            show_metadata: true,
            ..Default::default()
        };
        let output = render_tree(&tree, &options);
        assert_eq!(
            output,
            "model.pmx [bones: 3]\n└── [0] root\n    ├── [1] arm\n    └── [2] hair\n"
        );
    }

    #[test]
    fn test_max_depth() {
        let tree = skeleton_tree("model.pmx", &skeleton(), &[]);
        let options = TreeOptions {
            max_depth: Some(1),
            no_color: true,
            ..Default::default()
        };
        let output = render_tree(&tree, &options);
        assert!(output.contains("[0] root"));
        assert!(!output.contains("arm"));
    }
}
