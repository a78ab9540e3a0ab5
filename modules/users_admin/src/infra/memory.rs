use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::contract::{
    client::UsersRemote,
    error::RemoteError,
    model::{RemoteUser, User, UserDraft, UserId},
};

/// In-process remote directory. Behaves like the public mock service it
/// stands in for: assigns ids on create and answers 404 for unknown ids.
#[derive(Debug)]
pub struct InMemoryUsersRemote {
    state: Mutex<MemoryState>,
}

#[derive(Debug)]
struct MemoryState {
    users: Vec<User>,
    /// `None` once the id space is used up.
    next_id: Option<u64>,
}

impl InMemoryUsersRemote {
    pub fn new(users: Vec<User>) -> Self {
        let next_id = users
            .iter()
            .map(|u| u.id.0)
            .max()
            .map_or(Some(1), |max| max.checked_add(1));
        Self {
            state: Mutex::new(MemoryState { users, next_id }),
        }
    }

    /// A small directory to explore the console against.
    pub fn seeded() -> Self {
        let users = [
            ("Leanne Graham", "Sincere@april.biz", "Romaguera-Crona"),
            ("Ervin Howell", "Shanna@melissa.tv", "Deckow-Crist"),
            ("Clementine Bauch", "Nathan@yesenia.net", "Romaguera-Jacobson"),
            ("Patricia Lebsack", "Julianne.OConner@kory.org", "Robel-Corkery"),
            ("Chelsey Dietrich", "Lucio_Hettinger@annie.ca", "Keebler LLC"),
            ("Mrs. Dennis Schulist", "Karley_Dach@jasper.info", "Considine-Lockman"),
            ("Kurtis Weissnat", "Telly.Hoeger@billy.biz", "Johns Group"),
        ]
        .into_iter()
        .zip(1u64..)
        .map(|((name, email, company), id)| UserDraft::new(name, email, company).into_user(UserId(id)))
        .collect();
        Self::new(users)
    }

    pub fn users(&self) -> Vec<User> {
        self.state.lock().users.clone()
    }
}

impl Default for InMemoryUsersRemote {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl UsersRemote for InMemoryUsersRemote {
    async fn list_users(&self) -> Result<Vec<User>, RemoteError> {
        Ok(self.users())
    }

    async fn create_user(&self, draft: &UserDraft) -> Result<RemoteUser, RemoteError> {
        let mut state = self.state.lock();
        let Some(next) = state.next_id else {
            return Err(RemoteError::status(507));
        };
        let id = UserId(next);
        state.next_id = next.checked_add(1);
        state.users.push(draft.clone().into_user(id));
        debug!(user_id = %id, "In-memory create");
        Ok(RemoteUser {
            id: Some(id),
            fields: draft.clone().into_patch(),
        })
    }

    async fn update_user(&self, id: UserId, draft: &UserDraft) -> Result<RemoteUser, RemoteError> {
        let mut state = self.state.lock();
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| RemoteError::status(404))?;
        user.apply_patch(draft.clone().into_patch());
        Ok(RemoteUser {
            id: Some(id),
            fields: draft.clone().into_patch(),
        })
    }

    async fn delete_user(&self, id: UserId) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        let before = state.users.len();
        state.users.retain(|u| u.id != id);
        if state.users.len() == before {
            return Err(RemoteError::status(404));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_assigns_next_id_and_lists_it() {
        let remote = InMemoryUsersRemote::seeded();
        let echo = remote
            .create_user(&UserDraft::new("Zed", "z@z.io", "Zco"))
            .await
            .unwrap();

        assert_eq!(echo.id, Some(UserId(8)));
        let listed = remote.list_users().await.unwrap();
        assert_eq!(listed.len(), 8);
        assert_eq!(listed.last().unwrap().name, "Zed");
    }

    #[tokio::test]
    async fn exhausted_id_space_rejects_create() {
        let remote =
            InMemoryUsersRemote::new(vec![UserDraft::new("L", "l@x.com", "Co").into_user(UserId(u64::MAX))]);

        let err = remote
            .create_user(&UserDraft::new("Zed", "z@z.io", "Zco"))
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::status(507));
        assert_eq!(remote.users().len(), 1);
    }

    #[tokio::test]
    async fn unknown_ids_answer_not_found() {
        let remote = InMemoryUsersRemote::new(Vec::new());
        let draft = UserDraft::new("A", "a@x.com", "Co");

        assert_eq!(
            remote.update_user(UserId(3), &draft).await.unwrap_err(),
            RemoteError::status(404)
        );
        assert_eq!(
            remote.delete_user(UserId(3)).await.unwrap_err(),
            RemoteError::status(404)
        );
    }

    #[tokio::test]
    async fn update_and_delete_change_the_directory() {
        let remote = InMemoryUsersRemote::seeded();
        remote
            .update_user(UserId(1), &UserDraft::new("Leanne G", "l@g.io", "RC"))
            .await
            .unwrap();
        remote.delete_user(UserId(2)).await.unwrap();

        let users = remote.users();
        assert_eq!(users.len(), 6);
        assert_eq!(users[0].email, "l@g.io");
        assert!(users.iter().all(|u| u.id != UserId(2)));
    }
}
