//! `backoffice tree`: chart of accounts and cost-center hierarchies.

use std::fmt::Write;

use backoffice_core::{
    BackOffice, Command as CoreCommand, CommandResult, EntityId, Language, Resource, TreeNode,
    TreeView, model::flatten,
};

use crate::cli::{GlobalOpts, OutputFormat, TreeArgs, TreeResource};
use crate::error::CliError;
use crate::output::{self, Palette};

impl From<TreeResource> for Resource {
    fn from(tree: TreeResource) -> Self {
        match tree {
            TreeResource::Accounts => Resource::Accounts,
            TreeResource::CostCenters => Resource::CostCenters,
        }
    }
}

/// Drop inactive nodes together with their subtrees.
fn prune(nodes: &[TreeNode]) -> Vec<TreeNode> {
    nodes
        .iter()
        .filter(|n| n.is_active)
        .map(|n| TreeNode {
            children: prune(&n.children),
            ..n.clone()
        })
        .collect()
}

/// Outline with box-drawing guides.
fn outline(nodes: &[TreeNode], prefix: &str, language: Language, palette: Palette, out: &mut String) {
    for (i, node) in nodes.iter().enumerate() {
        let last = i + 1 == nodes.len();
        let branch = if last { "└─ " } else { "├─ " };
        let mut label = node.label(language);
        if !node.is_active {
            label = palette.dim(&format!("{label} (inactive)"));
        }
        let id = palette.dim(&format!("#{}", node.id));
        let _ = writeln!(out, "{prefix}{branch}{label}  {id}");

        let child_prefix = format!("{prefix}{}", if last { "   " } else { "│  " });
        outline(&node.children, &child_prefix, language, palette, out);
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(office: &BackOffice, args: TreeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resource = Resource::from(args.resource);
    let CommandResult::Tree(roots) = office.execute(CoreCommand::FetchTree { resource }).await?
    else {
        return Ok(());
    };

    let view = TreeView::new(roots);
    let mut roots = match args.root {
        Some(raw) => {
            let id = EntityId::from(raw);
            let node = view.find(&id).cloned().ok_or_else(|| CliError::NotFound {
                resource_type: resource.label().into(),
                identifier: id.to_string(),
                list_command: format!("tree {resource}"),
            })?;
            vec![node]
        }
        None => view.roots().to_vec(),
    };
    if args.active_only {
        roots = prune(&roots);
    }

    let language = office.language();
    let palette = Palette::new(global.color);
    let out = output::render_single(
        global.output,
        &roots,
        |nodes| {
            let mut text = String::new();
            outline(nodes, "", language, palette, &mut text);
            text.trim_end().to_owned()
        },
        |nodes| {
            flatten(nodes)
                .iter()
                .map(|n| n.id.to_string())
                .collect::<Vec<_>>()
                .join("\n")
        },
    )?;
    if global.output == OutputFormat::Table && roots.is_empty() {
        output::notice(&format!("No {} yet", resource.label().to_lowercase()), global.quiet);
    }
    output::print_output(&out, global.quiet);
    Ok(())
}
