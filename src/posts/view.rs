//! Read-side composition of post views.
//!
//! Posts are loaded as plain documents; the identities they reference
//! (post authors and comment authors) are fetched in one batch and joined
//! here, so the storage shape never leaks into responses.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::{
    auth::User,
    error::AppError,
    posts::{AuthorResponse, CommentResponse, PostDocument, PostResponse},
    store::Store,
};

pub async fn compose_posts(
    store: &dyn Store,
    docs: Vec<PostDocument>,
) -> Result<Vec<PostResponse>, AppError> {
    let mut ids: HashSet<Uuid> = HashSet::new();
    for doc in &docs {
        ids.insert(doc.post.author_id);
        ids.extend(doc.comments.iter().map(|c| c.author_id));
    }
    let ids: Vec<Uuid> = ids.into_iter().collect();
    let authors = author_index(store.find_users(&ids).await?);

    Ok(docs
        .into_iter()
        .map(|doc| assemble(doc, &authors))
        .collect())
}

pub async fn compose_post(store: &dyn Store, doc: PostDocument) -> Result<PostResponse, AppError> {
    compose_posts(store, vec![doc])
        .await?
        .pop()
        .ok_or(AppError::UpstreamFailure)
}

pub fn author_index(users: Vec<User>) -> HashMap<Uuid, AuthorResponse> {
    users
        .into_iter()
        .map(|u| {
            (
                u.id,
                AuthorResponse {
                    id: u.id,
                    username: u.username,
                    profile_pic: u.profile_pic,
                },
            )
        })
        .collect()
}

pub fn author_or_unknown(authors: &HashMap<Uuid, AuthorResponse>, id: Uuid) -> AuthorResponse {
    authors.get(&id).cloned().unwrap_or(AuthorResponse {
        id,
        username: "unknown".to_string(),
        profile_pic: None,
    })
}

fn assemble(doc: PostDocument, authors: &HashMap<Uuid, AuthorResponse>) -> PostResponse {
    let comments = doc
        .comments
        .into_iter()
        .map(|c| CommentResponse {
            id: c.id,
            author: author_or_unknown(authors, c.author_id),
            text: c.text,
            is_deleted: c.is_deleted,
            created_at: c.created_at,
        })
        .collect();

    PostResponse {
        id: doc.post.id,
        author: author_or_unknown(authors, doc.post.author_id),
        content: doc.post.content,
        image: doc.post.image,
        likes: doc.likes.into_iter().map(|id| (id, true)).collect(),
        comments,
        created_at: doc.post.created_at,
        updated_at: doc.post.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posts::{Comment, Post};
    use chrono::Utc;

    fn user(name: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: name.to_string(),
            email: format!("{name}@x.com"),
            phone: None,
            first_name: None,
            last_name: None,
            bio: None,
            profile_pic: Some(format!("https://img/{name}.png")),
            cover_pic: None,
            password_hash: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn assemble_resolves_authors_and_likes() {
        let alice = user("alice");
        let bob = user("bob");
        let now = Utc::now();
        let post_id = Uuid::new_v4();
        let doc = PostDocument {
            post: Post {
                id: post_id,
                author_id: alice.id,
                content: "hello".to_string(),
                image: "https://img/p.png".to_string(),
                created_at: now,
                updated_at: now,
            },
            likes: vec![bob.id],
            comments: vec![Comment {
                id: Uuid::new_v4(),
                post_id,
                author_id: bob.id,
                text: "nice".to_string(),
                is_deleted: false,
                seq: 1,
                created_at: now,
            }],
        };
        let bob_id = bob.id;
        let authors = author_index(vec![alice, bob]);

        let view = assemble(doc, &authors);
        assert_eq!(view.author.username, "alice");
        assert_eq!(view.likes.get(&bob_id), Some(&true));
        assert_eq!(view.comments[0].author.username, "bob");
    }

    #[test]
    fn missing_author_falls_back() {
        let id = Uuid::new_v4();
        let author = author_or_unknown(&HashMap::new(), id);
        assert_eq!(author.id, id);
        assert_eq!(author.username, "unknown");
    }
}
