#![allow(dead_code)]

use droidclaw::llm::types::ChatMessage;

/// One enabled clickable "Submit" button and one disabled "Cancel" button.
pub const SUBMIT_CANCEL_DUMP: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>
<hierarchy rotation="0">
  <node index="0" text="" resource-id="" class="android.widget.FrameLayout" package="com.example" content-desc="" clickable="false" enabled="true" bounds="[0,0][1080,2400]">
    <node index="0" text="Submit" resource-id="com.example:id/submit" class="android.widget.Button" package="com.example" content-desc="" checkable="false" checked="false" clickable="true" enabled="true" focusable="true" focused="false" scrollable="false" long-clickable="false" password="false" selected="false" bounds="[100,200][300,260]" />
    <node index="1" text="Cancel" resource-id="com.example:id/cancel" class="android.widget.Button" package="com.example" content-desc="" checkable="false" checked="false" clickable="false" enabled="false" focusable="false" focused="false" scrollable="false" long-clickable="false" password="false" selected="false" bounds="[400,200][600,260]" />
  </node>
</hierarchy>"#;

/// Login form: an edit field, an overlapping duplicate label and a button.
pub const LOGIN_DUMP: &str = r#"<hierarchy rotation="0">
  <node text="" class="android.widget.LinearLayout" clickable="false" enabled="true" bounds="[0,0][1080,1920]">
    <node text="" resource-id="app:id/user" class="android.widget.EditText" hint="Username" clickable="true" enabled="true" focused="true" bounds="[40,300][1040,400]" />
    <node text="Sign in" class="android.widget.TextView" clickable="false" enabled="true" bounds="[440,600][640,660]" />
    <node text="Sign in" resource-id="app:id/login" class="android.widget.Button" clickable="true" enabled="true" bounds="[441,601][641,661]" />
  </node>
</hierarchy>"#;

/// System prompt followed by `turns` user/assistant exchanges.
pub fn conversation(turns: usize) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system("You control an Android phone.")];
    for i in 0..turns {
        messages.push(ChatMessage::user(format!("step {i}: screen state")));
        messages.push(ChatMessage::assistant(format!(
            "{{\"action\":\"wait\",\"reason\":\"step {i}\"}}"
        )));
    }
    messages
}

/// Serves one canned HTTP response on a loopback port. Returns the base URL
/// and a handle resolving to the raw request the client sent.
pub async fn serve_once(
    status: u16,
    content_type: &'static str,
    body: String,
) -> (String, tokio::task::JoinHandle<String>) {
    use tokio::io::AsyncWriteExt;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let reason = if status < 400 { "OK" } else { "Error" };
        let response = format!(
            "HTTP/1.1 {status} {reason}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });

    (format!("http://{addr}"), handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    use tokio::io::AsyncReadExt;

    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let Some(head_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).to_lowercase();
        let body_len = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= head_end + 4 + body_len {
            break;
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// SSE body with one `delta.content` event per fragment, then `[DONE]`.
pub fn sse_body(fragments: &[&str]) -> String {
    let mut body = String::new();
    for fragment in fragments {
        let event = serde_json::json!({ "choices": [{ "index": 0, "delta": { "content": fragment } }] });
        body.push_str(&format!("data: {event}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}
