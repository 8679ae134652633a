//! Team resolution and the repository/team membership test.

use crate::identity::resolve;
use crate::model::{Repository, Team, User};
use std::collections::HashSet;

/// A team with its member set fixed. For inverted teams `members` is the set
/// of authors the team does *not* contain.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTeam {
    pub name: String,
    pub members: HashSet<String>,
    pub exclude: HashSet<String>,
    pub invert: bool,
    pub compare: Vec<String>,
}

impl ResolvedTeam {
    fn excludes(&self, email_lc: &str, name_lc: &str) -> bool {
        self.exclude.contains(email_lc) || self.exclude.contains(name_lc)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedTeams {
    teams: Vec<ResolvedTeam>,
}

impl ResolvedTeams {
    pub fn get(&self, name: &str) -> Option<&ResolvedTeam> {
        self.teams.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedTeam> {
        self.teams.iter()
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

fn lowercase_set<'a>(items: impl IntoIterator<Item = &'a String>) -> HashSet<String> {
    items.into_iter().map(|s| s.to_lowercase()).collect()
}

/// Fixes every team's member set. Explicit members of all non-inverted
/// teams are collected first; each inverted team then takes that union as
/// the set it complements, in place of its own `users` list.
pub fn resolve_team_memberships(teams: &[Team]) -> ResolvedTeams {
    let claimed: HashSet<String> = lowercase_set(
        teams
            .iter()
            .filter(|t| !t.invert)
            .flat_map(|t| t.users.iter()),
    );

    let teams = teams
        .iter()
        .map(|team| {
            let members = if team.invert {
                claimed.clone()
            } else {
                lowercase_set(&team.users)
            };
            ResolvedTeam {
                name: team.name.clone(),
                members,
                exclude: lowercase_set(&team.exclude),
                invert: team.invert,
                compare: team.compare.clone(),
            }
        })
        .collect();

    ResolvedTeams { teams }
}

/// Decides whether an author counts for a repository, optionally scoped to
/// a team. Holds no mutable state.
#[derive(Debug, Clone, Copy)]
pub struct Membership<'a> {
    users: &'a [User],
    teams: &'a ResolvedTeams,
    only_registered: bool,
}

impl<'a> Membership<'a> {
    pub fn new(users: &'a [User], teams: &'a ResolvedTeams, only_registered: bool) -> Self {
        Self {
            users,
            teams,
            only_registered,
        }
    }

    pub fn users(&self) -> &'a [User] {
        self.users
    }

    pub fn teams(&self) -> &'a ResolvedTeams {
        self.teams
    }

    pub fn belongs(
        &self,
        repository: &Repository,
        team: Option<&ResolvedTeam>,
        email: &str,
        name: &str,
    ) -> bool {
        let user = resolve(self.users, email, name);
        if self.only_registered && user.is_none() {
            return false;
        }

        let email = email.to_lowercase();
        let name = name.to_lowercase();
        if repository.excludes(&email, &name) {
            return false;
        }

        let Some(team) = team else {
            return true;
        };

        let includes_team = match user {
            Some(user) => team.members.contains(&user.name.to_lowercase()),
            None => team.members.contains(&email) || team.members.contains(&name),
        };

        (includes_team != team.invert) && !team.excludes(&email, &name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn users() -> Vec<User> {
        vec![
            User::new("alice", ["alice@corp.io"]),
            User::new("bob", ["bob@corp.io", "Bobby"]),
            User::new("carol", ["carol@corp.io"]),
        ]
    }

    fn teams() -> Vec<Team> {
        vec![
            Team {
                name: "core".into(),
                users: vec!["Alice".into(), "outsider@x.io".into()],
                exclude: vec!["Alice@corp.io".into()],
                ..Default::default()
            },
            Team {
                name: "web".into(),
                users: vec!["bob".into()],
                ..Default::default()
            },
            Team {
                name: "others".into(),
                invert: true,
                exclude: vec!["ci-bot@x.io".into()],
                ..Default::default()
            },
        ]
    }

    fn repo() -> Repository {
        Repository {
            name: "r".into(),
            url: "file:///r".into(),
            exclude: vec!["Dependabot".into()],
            ..Default::default()
        }
    }

    #[test]
    fn inverted_team_complements_all_explicit_members() {
        let resolved = resolve_team_memberships(&teams());
        let others = resolved.get("others").unwrap();
        let expected: HashSet<String> =
            ["alice", "outsider@x.io", "bob"].iter().map(|s| s.to_string()).collect();
        assert_eq!(others.members, expected);
        assert_eq!(resolved.get("core").unwrap().exclude, HashSet::from(["alice@corp.io".to_string()]));
    }

    #[test]
    fn inverted_team_ignores_its_own_user_list() {
        let users = users();
        let teams = vec![
            Team {
                name: "core".into(),
                users: vec!["alice".into()],
                ..Default::default()
            },
            Team {
                name: "rest".into(),
                users: vec!["zed".into()],
                invert: true,
                ..Default::default()
            },
        ];
        let resolved = resolve_team_memberships(&teams);
        let rest = resolved.get("rest").unwrap();
        assert_eq!(rest.members, HashSet::from(["alice".to_string()]));

        let m = Membership::new(&users, &resolved, false);
        assert!(m.belongs(&repo(), Some(rest), "zed@x.io", "zed"));
        assert!(!m.belongs(&repo(), Some(rest), "alice@corp.io", "Alice"));
    }

    #[test]
    fn repository_only_check_honours_repository_exclude() {
        let users = users();
        let resolved = resolve_team_memberships(&teams());
        let m = Membership::new(&users, &resolved, false);
        assert!(m.belongs(&repo(), None, "eve@x.io", "Eve"));
        assert!(!m.belongs(&repo(), None, "bot@github.com", "dependabot"));
    }

    #[test]
    fn registered_authors_match_teams_by_canonical_name() {
        let users = users();
        let resolved = resolve_team_memberships(&teams());
        let m = Membership::new(&users, &resolved, false);
        let web = resolved.get("web").unwrap();
        assert!(m.belongs(&repo(), Some(web), "other@mail", "BOBBY"));
        assert!(!m.belongs(&repo(), Some(web), "carol@corp.io", "Carol"));
    }

    #[test]
    fn unregistered_authors_match_teams_by_raw_email_or_name() {
        let users = users();
        let resolved = resolve_team_memberships(&teams());
        let m = Membership::new(&users, &resolved, false);
        let core = resolved.get("core").unwrap();
        assert!(m.belongs(&repo(), Some(core), "Outsider@X.io", "Someone"));

        let strict = Membership::new(&users, &resolved, true);
        assert!(!strict.belongs(&repo(), Some(core), "outsider@x.io", "Someone"));
    }

    #[test]
    fn inversion_flips_membership() {
        let users = users();
        let resolved = resolve_team_memberships(&teams());
        let m = Membership::new(&users, &resolved, false);
        let others = resolved.get("others").unwrap();
        assert!(m.belongs(&repo(), Some(others), "carol@corp.io", "Carol"));
        assert!(m.belongs(&repo(), Some(others), "eve@x.io", "Eve"));
        assert!(!m.belongs(&repo(), Some(others), "bob@corp.io", "Bob"));
        assert!(!m.belongs(&repo(), Some(others), "outsider@x.io", "O"));
    }

    #[test]
    fn exclusion_vetoes_membership_regardless_of_inversion() {
        let users = users();
        let resolved = resolve_team_memberships(&teams());
        let m = Membership::new(&users, &resolved, false);

        // alice is listed in core but alice's email is excluded
        let core = resolved.get("core").unwrap();
        assert!(!m.belongs(&repo(), Some(core), "alice@corp.io", "Alice"));

        let others = resolved.get("others").unwrap();
        assert!(!m.belongs(&repo(), Some(others), "ci-bot@x.io", "CI"));

        let mut flipped = core.clone();
        flipped.invert = true;
        assert!(!m.belongs(&repo(), Some(&flipped), "alice@corp.io", "Alice"));
    }

    #[test]
    fn membership_is_repeatable() {
        let users = users();
        let resolved = resolve_team_memberships(&teams());
        let m = Membership::new(&users, &resolved, true);
        let web = resolved.get("web").unwrap();
        let first = m.belongs(&repo(), Some(web), "bob@corp.io", "Bob");
        let second = m.belongs(&repo(), Some(web), "bob@corp.io", "Bob");
        assert_eq!(first, second);
        assert!(first);
    }
}
