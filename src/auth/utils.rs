use anyhow::Result;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::Rng;
use slug::slugify;

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();
    Ok(password_hash)
}

pub fn verify_password(hash: &str, password: &str) -> Result<()> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    Ok(())
}

/// Username for an account created from an OAuth profile.
/// Falls back to the local part of the email when the display name slugifies to nothing.
pub fn username_from_profile(name: Option<&str>, email: &str) -> String {
    let base = name.map(slugify).unwrap_or_default();
    if base.len() >= 3 {
        return base;
    }
    let local = email.split('@').next().unwrap_or(email);
    let base = slugify(local);
    if base.len() >= 3 {
        base
    } else {
        format!("user-{base}")
    }
}

/// Appends a random numeric suffix, used after a username collision.
pub fn with_random_suffix(username: &str) -> String {
    let n: u32 = rand::thread_rng().gen_range(1000..10000);
    format!("{username}-{n}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password(&hash, "correct horse").is_ok());
        assert!(verify_password(&hash, "battery staple").is_err());
    }

    #[test]
    fn verify_rejects_garbage_hash() {
        assert!(verify_password("not-a-phc-string", "anything").is_err());
    }

    #[test]
    fn username_prefers_display_name() {
        assert_eq!(
            username_from_profile(Some("Ada Lovelace"), "ada@x.com"),
            "ada-lovelace"
        );
        assert_eq!(username_from_profile(None, "grace.h@x.com"), "grace-h");
        assert_eq!(username_from_profile(Some("!"), "al@x.com"), "user-al");
    }

    #[test]
    fn suffix_keeps_base() {
        let name = with_random_suffix("ada");
        assert!(name.starts_with("ada-"));
        assert_eq!(name.len(), "ada-".len() + 4);
    }
}
