use std::collections::HashMap;
use percent_encoding::percent_decode_str;
use super::RoutingError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// 경로 패턴
///
/// `/`로 구분된 세그먼트 단위로 매칭합니다. `{name}` 세그먼트는 비어 있지 않은
/// 세그먼트 하나에 매칭되며, `/`로 끝나는 패턴은 그 아래 경로 전체에 매칭됩니다.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
    subtree: bool,
}

/// `:name` 세그먼트를 `{name}`으로 바꿉니다.
pub fn rewrite_params(pattern: &str) -> String {
    pattern
        .split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) if !name.is_empty() => format!("{{{}}}", name),
            _ => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_param_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, RoutingError> {
        if !pattern.starts_with('/') {
            return Err(RoutingError::invalid_pattern(pattern, "'/'로 시작해야 합니다"));
        }

        let raw = rewrite_params(pattern);
        let rest = &raw[1..];
        let subtree = rest.is_empty() || rest.ends_with('/');
        let body = rest.strip_suffix('/').unwrap_or(rest);

        let mut segments = Vec::new();
        if !body.is_empty() {
            for part in body.split('/') {
                let segment = match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                    Some(name) if is_param_name(name) => {
                        if segments.contains(&Segment::Param(name.to_string())) {
                            return Err(RoutingError::invalid_pattern(pattern, format!("중복된 파라미터: {}", name)));
                        }
                        Segment::Param(name.to_string())
                    }
                    Some(name) => {
                        return Err(RoutingError::invalid_pattern(pattern, format!("잘못된 파라미터 이름: {:?}", name)));
                    }
                    None if part.contains('{') || part.contains('}') => {
                        return Err(RoutingError::invalid_pattern(pattern, "파라미터는 세그먼트 전체여야 합니다"));
                    }
                    None => Segment::Literal(part.to_string()),
                };
                segments.push(segment);
            }
        }

        Ok(Self { raw, segments, subtree })
    }

    /// `{name}` 형식으로 정규화된 패턴
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty() && self.subtree
    }

    /// 경로가 매칭되면 디코드된 경로 파라미터를 반환합니다.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let rest = path.strip_prefix('/')?;
        let parts: Vec<&str> = rest.split('/').collect();

        if self.subtree {
            if parts.len() <= self.segments.len() {
                return None;
            }
        } else if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts.iter()) {
            match segment {
                Segment::Literal(literal) => {
                    if literal != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    let value = percent_decode_str(part).decode_utf8_lossy().into_owned();
                    params.insert(name.clone(), value);
                }
            }
        }
        Some(params)
    }

    /// 구체적인 패턴일수록 큰 값. 앞 세그먼트부터 리터럴이 파라미터보다 우선하고,
    /// 같으면 세그먼트가 더 많은 쪽, 그다음 하위 경로 패턴이 아닌 쪽이 우선합니다.
    pub fn specificity(&self) -> (Vec<u8>, bool) {
        let ranks = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(_) => 2,
                Segment::Param(_) => 1,
            })
            .collect();
        (ranks, !self.subtree)
    }

    /// 파라미터 이름을 지운 형태. 같은 값이면 같은 경로 집합에 매칭됩니다.
    pub(crate) fn shape(&self) -> String {
        let mut shape = String::new();
        for segment in &self.segments {
            shape.push('/');
            match segment {
                Segment::Literal(literal) => shape.push_str(literal),
                Segment::Param(_) => shape.push_str("{}"),
            }
        }
        if self.subtree {
            shape.push('/');
        }
        shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_params() {
        assert_eq!(rewrite_params("/hello/:name"), "/hello/{name}");
        assert_eq!(rewrite_params("/a/:x/b/:y/"), "/a/{x}/b/{y}/");
        assert_eq!(rewrite_params("/hello/{name}"), "/hello/{name}");
        assert_eq!(rewrite_params("/time/10:30"), "/time/10:30");
    }

    #[test]
    fn test_param_syntaxes_match_alike() {
        for raw in ["/hello/:name", "/hello/{name}"] {
            let pattern = PathPattern::parse(raw).unwrap();
            let params = pattern.matches("/hello/Ann").unwrap();
            assert_eq!(params.get("name").map(String::as_str), Some("Ann"), "pattern: {}", raw);
            assert!(pattern.matches("/hello/").is_none());
            assert!(pattern.matches("/hello/Ann/x").is_none());
        }
    }

    #[test]
    fn test_params_are_percent_decoded() {
        let pattern = PathPattern::parse("/files/{name}").unwrap();
        let params = pattern.matches("/files/a%20b").unwrap();
        assert_eq!(params["name"], "a b");
    }

    #[test]
    fn test_subtree_patterns() {
        let root = PathPattern::parse("/").unwrap();
        assert!(root.is_root());
        assert!(root.matches("/").is_some());
        assert!(root.matches("/anything/at/all").is_some());

        let admin = PathPattern::parse("/admin/").unwrap();
        assert!(!admin.is_root());
        assert!(admin.matches("/admin/").is_some());
        assert!(admin.matches("/admin/users").is_some());
        assert!(admin.matches("/admin").is_none());
    }

    #[test]
    fn test_invalid_patterns() {
        let cases = vec!["relative", "/a/{}", "/a/{b-c}", "/a/x{b}", "/a/{id}/{id}"];
        for raw in cases {
            assert!(PathPattern::parse(raw).is_err(), "pattern: {}", raw);
        }
    }

    #[test]
    fn test_specificity_ordering() {
        let literal = PathPattern::parse("/users/me").unwrap();
        let param = PathPattern::parse("/users/{id}").unwrap();
        let subtree = PathPattern::parse("/users/").unwrap();
        let root = PathPattern::parse("/").unwrap();

        assert!(literal.specificity() > param.specificity());
        assert!(param.specificity() > subtree.specificity());
        assert!(subtree.specificity() > root.specificity());
    }

    #[test]
    fn test_shape_ignores_param_names() {
        let a = PathPattern::parse("/users/{id}").unwrap();
        let b = PathPattern::parse("/users/:user").unwrap();
        assert_eq!(a.shape(), b.shape());
        assert_eq!(b.as_str(), "/users/{user}");
    }
}
