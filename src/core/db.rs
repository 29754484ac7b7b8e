use tracing::info;

use crate::core::helpers::hash_password;
use crate::core::store::EntityStore;
use crate::models::models::{NewPost, NewUser};

struct DemoUser {
    username: &'static str,
    name: &'static str,
    bio: &'static str,
    avatar: &'static str,
    theme_color: Option<&'static str>,
    post: (&'static str, &'static str),
}

const DEMO_PASSWORD: &str = "password123";

const DEMO_USERS: [DemoUser; 4] = [
    DemoUser {
        username: "pierre_network",
        name: "Pierre Network",
        bio: "Bienvenue sur mon réseau social. Partagez vos photos et vos vidéos avec vos amis !",
        avatar: "/assets/ENILV.jpg",
        theme_color: Some("#3498db"),
        post: (
            "Bienvenue sur Pierre Niney Network ! Le réseau social où vous pouvez partager vos moments préférés.",
            "/assets/ENILV.jpg",
        ),
    },
    DemoUser {
        username: "jean_dupont",
        name: "Jean Dupont",
        bio: "Photographe amateur et passionné de cinéma.",
        avatar: "/assets/Favé.png",
        theme_color: None,
        post: ("Une magnifique journée à la plage. Que demander de plus ?", "/assets/design.jpeg"),
    },
    DemoUser {
        username: "marie_claire",
        name: "Marie Claire",
        bio: "Voyageuse et amoureuse de la nature.",
        avatar: "/assets/Séduire.png",
        theme_color: None,
        post: ("Mon nouveau projet photo commence aujourd'hui !", "/assets/image_1743428476401.png"),
    },
    DemoUser {
        username: "thomas_martin",
        name: "Thomas Martin",
        bio: "Coach sportif et passionné de fitness.",
        avatar: "/assets/Abdos.png",
        theme_color: None,
        post: ("Séance d'entraînement du jour terminée. Qui est motivé pour demain ?", "/assets/Abdos.png"),
    },
];

/// Seeds the demo users and one post each, unless users already exist.
pub fn seed_demo_data(store: &dyn EntityStore) -> anyhow::Result<()> {
    if !store.list_users()?.is_empty() {
        return Ok(()); // Already initialized
    }

    let password_hash = hash_password(DEMO_PASSWORD)?;
    for demo in &DEMO_USERS {
        let user = store.insert_user(NewUser {
            username: demo.username.to_string(),
            password_hash: password_hash.clone(),
            name: demo.name.to_string(),
            bio: Some(demo.bio.to_string()),
            avatar: Some(demo.avatar.to_string()),
            theme_color: demo.theme_color.map(str::to_string),
            ..Default::default()
        })?;

        let (content, image) = demo.post;
        store.insert_post(NewPost {
            user_id: user.id,
            content: content.to_string(),
            image: Some(image.to_string()),
            video: None,
            media_type: Some("image".to_string()),
        })?;
    }

    info!(users = DEMO_USERS.len(), "demo data seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryStore;

    #[test]
    fn seeding_is_idempotent() {
        let store = MemoryStore::new();
        seed_demo_data(&store).unwrap();
        seed_demo_data(&store).unwrap();

        let users = store.list_users().unwrap();
        assert_eq!(users.len(), 4);
        assert_eq!(users[0].username, "pierre_network");
        assert_eq!(users[0].id, 1);
        assert!(users.iter().all(|u| u.posts == 1));
        assert_eq!(store.list_posts().unwrap().len(), 4);
    }
}
