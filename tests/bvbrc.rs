use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use assert_matches::assert_matches;

use amr_genome_fetch::bvbrc::{BvbrcHttpClient, ClientSettings, SequenceClient};
use amr_genome_fetch::domain::GenomeId;
use amr_genome_fetch::error::FetchError;

/// One captured HTTP request: request line, lowercased header lines, body.
struct Captured {
    request_line: String,
    headers: Vec<String>,
    body: String,
}

impl Captured {
    fn has_header(&self, name: &str, value: &str) -> bool {
        let expected = format!("{}: {}", name.to_lowercase(), value.to_lowercase());
        self.headers.iter().any(|line| *line == expected)
    }
}

/// Answers one connection per canned `(status, body)` pair, in order, and
/// hands back what it received.
fn serve(replies: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<Captured>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let url = format!(
        "http://127.0.0.1:{port}/api/genome_sequence/?&http_download=true&http_accept=application/dna+fasta"
    );

    let handle = thread::spawn(move || {
        let mut captured = Vec::new();
        for (status, body) in replies {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut headers = Vec::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end().to_lowercase();
                if line.is_empty() {
                    break;
                }
                headers.push(line);
            }
            let length = headers
                .iter()
                .find_map(|line| line.strip_prefix("content-length: "))
                .map(|value| value.parse::<usize>().unwrap())
                .unwrap_or(0);
            let mut raw_body = vec![0u8; length];
            reader.read_exact(&mut raw_body).unwrap();

            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {status} Canned\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            stream.flush().unwrap();

            captured.push(Captured {
                request_line: request_line.trim_end().to_string(),
                headers,
                body: String::from_utf8(raw_body).unwrap(),
            });
        }
        captured
    });
    (url, handle)
}

fn client(url: String, retries: usize) -> BvbrcHttpClient {
    let settings = ClientSettings {
        url,
        timeout: Duration::from_secs(5),
        retries,
        ..ClientSettings::default()
    };
    BvbrcHttpClient::new(settings).unwrap()
}

fn genome(id: &str) -> GenomeId {
    id.parse().unwrap()
}

#[test]
fn posts_rql_form_with_browser_headers() {
    let (url, server) = serve(vec![(200, ">contig1\nACGT\n")]);

    let body = client(url, 0).fetch_fasta(&genome("573.1")).unwrap();
    assert_eq!(body, ">contig1\nACGT\n");

    let requests = server.join().unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert!(request.request_line.starts_with("POST /api/genome_sequence/?"));
    assert!(request.request_line.contains("http_accept=application/dna+fasta"));
    assert!(request.has_header("Origin", "https://www.bv-brc.org"));
    assert!(request.has_header("Referer", "https://www.bv-brc.org/"));
    assert!(request.has_header(
        "User-Agent",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:105.0) Gecko/20100101 Firefox/105.0"
    ));
    assert!(request.has_header("Content-Type", "application/x-www-form-urlencoded"));
    assert_eq!(
        request.body,
        "rql=in%28genome_id%252C%28573.1%29%29%2526sort%28%252Bsequence_id%29%2526limit%282500000%29"
    );
}

#[test]
fn empty_body_is_returned_as_empty_text() {
    let (url, server) = serve(vec![(200, "")]);

    let body = client(url, 0).fetch_fasta(&genome("573.2")).unwrap();
    assert!(body.is_empty());
    server.join().unwrap();
}

#[test]
fn client_error_status_is_not_retried() {
    let (url, server) = serve(vec![(404, "not found")]);

    let err = client(url, 2).fetch_fasta(&genome("573.3")).unwrap_err();
    assert_matches!(
        err,
        FetchError::ApiStatus { genome_id, status: 404 } if genome_id == "573.3"
    );
    assert_eq!(server.join().unwrap().len(), 1);
}

#[test]
fn unavailable_service_is_retried() {
    let (url, server) = serve(vec![(503, "busy"), (200, ">contig1\nAC\n")]);

    let body = client(url, 1).fetch_fasta(&genome("573.4")).unwrap();
    assert_eq!(body, ">contig1\nAC\n");

    let requests = server.join().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].body, requests[1].body);
}

#[test]
fn last_retryable_status_is_reported() {
    let (url, server) = serve(vec![(503, "busy")]);

    let err = client(url, 0).fetch_fasta(&genome("573.5")).unwrap_err();
    assert_matches!(err, FetchError::ApiStatus { status: 503, .. });
    assert_eq!(server.join().unwrap().len(), 1);
}
