//! Token wire format: URL-safe base64 (no padding) of `"<id>::<type>"`.

use crate::{ResolverError, ResolverResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use folio_types::EntryReference;

/// Separates id and type inside a token. Reserved: ids may not contain it.
pub const TOKEN_SEPARATOR: &str = "::";

/// Rejects ids that would make the first separator in `"<id>::<type>"`
/// ambiguous: ids containing `"::"` or ending in `':'`.
pub(crate) fn check_reserved(id: &str) -> ResolverResult<()> {
    if id.contains(TOKEN_SEPARATOR) || id.ends_with(':') {
        return Err(ResolverError::ReservedSeparator { id: id.to_string() });
    }
    Ok(())
}

/// Encodes a reference without consulting any resolver.
pub fn encode_key(reference: &EntryReference) -> ResolverResult<String> {
    check_reserved(&reference.id)?;
    reference.validate()?;

    let key = format!("{}{}{}", reference.id, TOKEN_SEPARATOR, reference.entry_type);
    Ok(URL_SAFE_NO_PAD.encode(key.as_bytes()))
}

/// Decodes a token into a reference without consulting any resolver.
///
/// Trailing `=` padding is tolerated so tokens produced by padded encoders
/// still decode.
pub fn decode_key(token: &str) -> ResolverResult<EntryReference> {
    let trimmed = token.trim().trim_end_matches('=');
    if trimmed.is_empty() {
        return Err(ResolverError::invalid_token(token, "empty token"));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(|e| ResolverError::invalid_token(token, format!("not base64: {e}")))?;
    let key = String::from_utf8(bytes)
        .map_err(|_| ResolverError::invalid_token(token, "not valid UTF-8"))?;

    let (id, entry_type) = key
        .split_once(TOKEN_SEPARATOR)
        .ok_or_else(|| ResolverError::invalid_token(token, "missing separator"))?;
    if id.is_empty() || entry_type.is_empty() {
        return Err(ResolverError::invalid_token(token, "empty id or type"));
    }

    Ok(EntryReference::new(id, entry_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_id_and_type() {
        let token = encode_key(&EntryReference::new("w1", "work")).unwrap();
        assert_eq!(URL_SAFE_NO_PAD.decode(&token).unwrap(), b"w1::work");
    }

    #[test]
    fn token_is_url_safe() {
        let token = encode_key(&EntryReference::new("\u{fb}\u{ff}?>", "work")).unwrap();
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
        assert!(!token.contains('='));
    }

    #[test]
    fn decode_tolerates_padding() {
        let padded = base64::engine::general_purpose::URL_SAFE.encode("w1::work");
        assert!(padded.ends_with('='));
        assert_eq!(decode_key(&padded).unwrap(), EntryReference::new("w1", "work"));
    }

    #[test]
    fn decode_type_may_contain_separator() {
        let token = URL_SAFE_NO_PAD.encode("w1::ns::work");
        let r = decode_key(&token).unwrap();
        assert_eq!(r.id, "w1");
        assert_eq!(r.entry_type, "ns::work");
    }

    #[test]
    fn id_ending_in_colon_is_reserved() {
        for id in ["urn:isbn:", ":", "a::b"] {
            assert!(matches!(
                encode_key(&EntryReference::new(id, "work")),
                Err(ResolverError::ReservedSeparator { .. })
            ));
        }
        let token = encode_key(&EntryReference::new(":urn:isbn", "work")).unwrap();
        assert_eq!(decode_key(&token).unwrap().id, ":urn:isbn");
    }

    #[test]
    fn decode_rejects_missing_parts() {
        for raw in ["w1work", "::work", "w1::"] {
            let token = URL_SAFE_NO_PAD.encode(raw);
            assert!(matches!(
                decode_key(&token),
                Err(ResolverError::InvalidToken { .. })
            ));
        }
    }
}
