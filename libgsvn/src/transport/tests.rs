use super::*;

#[test]
fn parses_plain_svn_url() {
    let url = SvnUrl::parse("svn://host/repo/trunk").unwrap();
    assert_eq!(url.tunnel, None);
    assert_eq!(url.host, "host");
    assert_eq!(url.port, 3690);
    assert_eq!(url.path, "/repo/trunk");
}

#[test]
fn parses_explicit_port() {
    let url = SvnUrl::parse("svn://host:9000/repo").unwrap();
    assert_eq!(url.host, "host");
    assert_eq!(url.port, 9000);
    assert_eq!(url.path, "/repo");
}

#[test]
fn parses_tunnel_scheme() {
    let url = SvnUrl::parse("svn+ssh://user@host/repo").unwrap();
    assert_eq!(url.tunnel.as_deref(), Some("ssh"));
    assert_eq!(url.host, "user@host");
    assert_eq!(url.port, 3690);
    assert_eq!(url.path, "/repo");
}

#[test]
fn parses_url_with_no_path() {
    let url = SvnUrl::parse("svn://host").unwrap();
    assert_eq!(url.host, "host");
    assert_eq!(url.path, "/");
}

#[test]
fn rejects_non_svn_scheme() {
    assert!(SvnUrl::parse("http://host/repo").is_err());
}

#[test]
fn rejects_bad_port() {
    assert!(SvnUrl::parse("svn://host:notaport/repo").is_err());
}
