use crate::model::User;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NetworkNode {
    pub name: String,
    pub repositories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NetworkEdge {
    pub source: String,
    pub target: String,
    pub repositories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Network {
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
}

impl Network {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// One node per configured user, isolated or not, and one edge per pair of
/// users sharing at least one repository.
pub fn normalize(users: &[User], contributions: &BTreeMap<String, BTreeSet<String>>) -> Network {
    let empty = BTreeSet::new();
    let repos_of = |user: &User| contributions.get(&user.name).unwrap_or(&empty);

    let nodes = users
        .iter()
        .map(|user| NetworkNode {
            name: user.name.clone(),
            repositories: repos_of(user).iter().cloned().collect(),
        })
        .collect();

    let mut edges = Vec::new();
    for (i, a) in users.iter().enumerate() {
        for b in &users[i + 1..] {
            let shared: Vec<String> = repos_of(a).intersection(repos_of(b)).cloned().collect();
            if !shared.is_empty() {
                edges.push(NetworkEdge {
                    source: a.name.clone(),
                    target: b.name.clone(),
                    repositories: shared,
                });
            }
        }
    }

    Network { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn edges_join_users_sharing_a_repository() {
        let users = vec![
            User::new("alice", ["a@x"]),
            User::new("bob", ["b@x"]),
            User::new("carol", ["c@x"]),
            User::new("dave", ["d@x"]),
        ];
        let contributions = BTreeMap::from([
            ("alice".to_string(), set(&["api", "web"])),
            ("bob".to_string(), set(&["web"])),
            ("carol".to_string(), set(&["docs"])),
        ]);

        let network = normalize(&users, &contributions);
        assert_eq!(network.nodes.len(), 4);
        assert_eq!(network.nodes[3], NetworkNode { name: "dave".into(), repositories: vec![] });
        assert_eq!(
            network.edges,
            vec![NetworkEdge {
                source: "alice".into(),
                target: "bob".into(),
                repositories: vec!["web".into()],
            }]
        );
    }

    #[test]
    fn no_users_means_empty_network() {
        assert!(normalize(&[], &BTreeMap::new()).is_empty());
    }
}
