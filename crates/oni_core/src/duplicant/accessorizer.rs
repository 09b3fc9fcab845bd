use super::scan::scan_strings;
use super::types::hat_role_base;

const HAT_MARKER: &str = "hat_role_";
const HAT_SCAN_LIMIT: usize = 128;

/// Role implied by the first worn `hat_role_*` accessory, e.g.
/// `hat_role_mining2` becomes `Miner T2`.
pub(crate) fn hat_role(payload: &[u8]) -> Option<String> {
    scan_strings(payload, HAT_SCAN_LIMIT)
        .iter()
        .filter(|s| s.contains(HAT_MARKER))
        .find_map(|s| role_from_token(s))
}

pub(crate) fn role_from_token(token: &str) -> Option<String> {
    let (_, rest) = token.split_once(HAT_MARKER)?;
    let letters = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    if letters == 0 {
        return None;
    }
    let group = rest[..letters].to_ascii_lowercase();
    let tail = &rest[letters..];
    let tier_len = tail
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(tail.len());
    let tier = &tail[..tier_len];

    let base = hat_role_base(&group);
    Some(if tier.is_empty() {
        base
    } else {
        format!("{base} T{tier}")
    })
}

#[cfg(test)]
mod tests {
    use super::{hat_role, role_from_token};

    fn klei(s: &str) -> Vec<u8> {
        let mut out = (s.len() as i32).to_le_bytes().to_vec();
        out.extend_from_slice(s.as_bytes());
        out
    }

    #[test]
    fn maps_hat_tokens_to_roles() {
        assert_eq!(role_from_token("hat_role_building3").as_deref(), Some("Builder T3"));
        assert_eq!(role_from_token("hat_role_Digging").as_deref(), Some("Miner"));
        assert_eq!(role_from_token("hat_role_supplyCourier2").as_deref(), Some("Courier T2"));
        assert_eq!(role_from_token("hat_role_astronaut1").as_deref(), Some("Astronaut T1"));
        assert_eq!(role_from_token("hat_role_").as_deref(), None);
        assert_eq!(role_from_token("hat_role_42").as_deref(), None);
        assert_eq!(role_from_token("no marker"), None);
    }

    #[test]
    fn uses_the_first_hat_in_the_block() {
        let mut block = vec![0xEE];
        block.extend(klei("body_shirt_1"));
        block.extend(klei("hat_role_medical2"));
        block.extend(klei("hat_role_mining1"));
        assert_eq!(hat_role(&block).as_deref(), Some("Doctor T2"));
        assert_eq!(hat_role(&klei("body_shirt_1")), None);
    }
}
