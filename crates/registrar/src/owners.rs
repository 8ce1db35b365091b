//! Chain selection from the registry's CODEOWNERS file.
//!
//! Each chain directory is owned through a `/<chain-id>/` rule. Owners of
//! the catch-all `*` rule maintain every chain.

struct Rule<'a> {
    pattern: &'a str,
    owners: Vec<&'a str>,
}

impl Rule<'_> {
    fn owned_by(&self, owner: &str) -> bool {
        self.owners
            .iter()
            .any(|o| o.strip_prefix('@') == Some(owner))
    }

    fn chain_id(&self) -> Option<&str> {
        let inner = self.pattern.strip_prefix('/')?.strip_suffix('/')?;
        (!inner.is_empty() && !inner.contains('/')).then_some(inner)
    }
}

fn parse_rules(content: &str) -> Vec<Rule<'_>> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let pattern = fields.next()?;
            Some(Rule {
                pattern,
                owners: fields.take_while(|f| !f.starts_with('#')).collect(),
            })
        })
        .collect()
}

/// Chains maintained by `owner` (with or without a leading `@`), in file
/// order.
pub fn select_chains(content: &str, owner: &str) -> Vec<String> {
    let owner = owner.trim_start_matches('@');
    let rules = parse_rules(content);
    let owns_everything = rules
        .iter()
        .any(|rule| rule.pattern == "*" && rule.owned_by(owner));

    let mut chains: Vec<String> = Vec::new();
    for rule in &rules {
        let Some(chain_id) = rule.chain_id() else {
            continue;
        };
        if (owns_everything || rule.owned_by(owner)) && !chains.iter().any(|c| c == chain_id) {
            chains.push(chain_id.to_owned());
        }
    }
    chains
}
