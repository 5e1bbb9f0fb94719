use super::{crypto, models::User};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

/// HMAC-secured session string, signed by $SESSION_SECRET. The
/// authentication service issues these; we only need to read them back.
///
/// Note: since this guy is stored in a browser cookie, it's important to
/// esure it does not get too large.
#[derive(Debug, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
}

#[cfg(test)]
pub fn serialize_session(secret: &[u8], session: &Session) -> String {
    let json_bytes = serde_json::to_string(&session)
        .expect("session can be JSON serialized");
    let b64 = general_purpose::STANDARD_NO_PAD.encode(json_bytes);
    let raw_digest = crypto::get_digest(secret, b64.as_bytes());
    let digest = general_purpose::STANDARD_NO_PAD.encode(raw_digest);

    format!("{}:{}", b64, digest)
}

pub fn deserialize_session(
    secret: &[u8],
    cookie: &str,
) -> Result<Session, &'static str> {
    let Some((b64_json, b64_digest)) = cookie.split_once(':') else {
        return Err("Invalid session");
    };
    let digest = general_purpose::STANDARD_NO_PAD
        .decode(b64_digest)
        .map_err(|_| "Cannot base64 decode the digest")?;

    if !crypto::is_valid(secret, b64_json.as_bytes(), &digest) {
        return Err("Failed to validate session signature");
    }
    let json_string = general_purpose::STANDARD_NO_PAD
        .decode(b64_json)
        .map_err(|_| "Cannot base64 decode session string")?;

    serde_json::from_slice(&json_string)
        .map_err(|_| "Cannot deserialize session JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"foo";

    fn get_session() -> Session {
        Session {
            user: User {
                id: 1,
                username: "Jack".to_string(),
                email: "jack@jack.com".to_string(),
            },
        }
    }

    const SERIALIZED_SESSION: &str =
        "eyJ1c2VyIjp7ImlkIjoxLCJ1c2VybmFtZSI6IkphY2siLCJlbWFpbCI6ImphY2tAamFjay5jb20ifX0:LfHxWjYfG4U7uYkneVf8ZadB3C2z8qV3a8kp1Tnt1sU";

    #[test]
    fn test_serialize_session() {
        let result = serialize_session(SECRET, &get_session());
        // little snapshot test
        assert_eq!(result, SERIALIZED_SESSION);
    }

    #[test]
    fn test_deserialize_session() {
        let result =
            deserialize_session(SECRET, SERIALIZED_SESSION).expect("result");
        assert_eq!(result.user, get_session().user);
    }

    #[test]
    fn test_deserialize_rejects_wrong_secret() {
        assert!(deserialize_session(b"bar", SERIALIZED_SESSION).is_err());
    }

    #[test]
    fn test_deserialize_rejects_tampering() {
        let (_, digest) = SERIALIZED_SESSION.split_once(':').unwrap();
        let forged = general_purpose::STANDARD_NO_PAD.encode(
            r#"{"user":{"id":2,"username":"Jack","email":"jack@jack.com"}}"#,
        );
        let cookie = format!("{forged}:{digest}");
        assert!(deserialize_session(SECRET, &cookie).is_err());
        assert!(deserialize_session(SECRET, "no-colon-here").is_err());
    }
}
