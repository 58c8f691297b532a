//! Static usage text, returned by `help` and attached to precondition failures.

use serde::Serialize;

use super::bind::CommandKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub usage: &'static str,
    pub syntax: &'static str,
    pub examples: &'static [&'static str],
}

pub fn usage(kind: CommandKind) -> Usage {
    match kind {
        CommandKind::Add => Usage {
            usage: "add",
            syntax: "!add <link> [name: <name>] [tags: [<tag>, ...]] [notes: [<note>, ...]] [<key>: <value>]",
            examples: &[
                r#"!add example.com tags: [one, two] description: "looks really cool""#,
                "!add link: github.com/rust-lang/rust name: Rust tags: [lang:rust]",
            ],
        },
        CommandKind::Get => Usage {
            usage: "get",
            syntax: "!get <id> [[<field>, ...]] [hidden: true]",
            examples: &["!get 123", "!get 123 [id, link, tags]"],
        },
        CommandKind::Update => Usage {
            usage: "update",
            syntax: "!update <id> [name: <name>] [link: <link>] [tags: [<tag>, ...] | +[<tag>, ...] -[<tag>, ...]] [<key>: <value>]",
            examples: &[
                "!update 123 name: newname tags: [newone, newtwo]",
                "!update 123 tags: +[four, five, seven] -one",
            ],
        },
        CommandKind::Find => Usage {
            usage: "find",
            syntax: r#"!find ["<keyword>"] [[<field>, ...]] [tags: ...] [link: <text>] [name: <text>] [page: <n>]"#,
            examples: &[
                r#"!find "keyword""#,
                r#"!find tags: [one, two, "three"]"#,
                "!find [id, link, tags] tags: +rust -old page: 2",
            ],
        },
        CommandKind::Delete => Usage {
            usage: "delete",
            syntax: "!delete <id>",
            examples: &["!delete 123"],
        },
        CommandKind::Help => Usage {
            usage: "help",
            syntax: "!help [<command>]",
            examples: &["!help", "!help update"],
        },
    }
}

/// Usage of every command, in declaration order.
pub fn all() -> Vec<Usage> {
    CommandKind::ALL.into_iter().map(usage).collect()
}
