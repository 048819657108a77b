use super::*;
use serde_json::json;

#[test]
fn presence_update_offline_defaults_to_false() {
    let frame: ChatClientFrame =
        serde_json::from_value(json!({"type": "presence_update", "username": "dotfan"}))
            .expect("parse");

    match frame {
        ChatClientFrame::PresenceUpdate { username, offline } => {
            assert_eq!(username, "dotfan");
            assert!(!offline);
        }
        other => panic!("expected presence_update, got {other:?}"),
    }
}

#[test]
fn client_frames_use_snake_case_tags() {
    let raw = json!({"type": "get_private_history", "with_user": "ada"});
    let frame: ChatClientFrame = serde_json::from_value(raw).expect("parse");
    assert!(matches!(
        frame,
        ChatClientFrame::GetPrivateHistory { ref with_user } if with_user == "ada"
    ));

    let raw = json!({"type": "forgot_password", "username": "ada"});
    let frame: ChatClientFrame = serde_json::from_value(raw).expect("parse");
    assert!(matches!(frame, ChatClientFrame::ForgotPassword { .. }));
}

#[test]
fn unknown_frame_type_is_an_error() {
    let result =
        serde_json::from_value::<ChatClientFrame>(json!({"type": "launch_missiles"}));
    assert!(result.is_err());
}

#[test]
fn username_status_serializes_flat() {
    let frame = ChatServerFrame::UsernameStatus {
        username: "ada".into(),
        taken: true,
        password_protected: true,
        has_email: false,
    };

    let value = serde_json::to_value(&frame).expect("serialize");
    assert_eq!(value["type"], "username_status");
    assert_eq!(value["username"], "ada");
    assert_eq!(value["taken"], true);
    assert_eq!(value["password_protected"], true);
    assert_eq!(value["has_email"], false);
}

#[test]
fn private_history_carries_message_views() {
    let frame = ChatServerFrame::PrivateHistory {
        with_user: "ada".into(),
        messages: vec![PrivateMessage {
            from: "ada".into(),
            to: "bob".into(),
            message: "hi".into(),
            timestamp: "09:30".into(),
        }],
    };

    let value = serde_json::to_value(&frame).expect("serialize");
    assert_eq!(value["type"], "private_history");
    assert_eq!(value["messages"][0]["from"], "ada");
    assert_eq!(value["messages"][0]["timestamp"], "09:30");
}
