// Element grammars for the supported SEMP versions.
//
// Each rule names the children an element may hold. Flags take neither text
// nor children, text elements take a value (possibly empty), and parents
// take children only. A parent with no required children may also appear
// empty, e.g. `<show><message-spool/></show>`.

use crate::version::SempVersion;

#[derive(Debug)]
pub(crate) enum Content {
    Flag,
    Text,
    Children(Vec<ElementRule>),
}

#[derive(Debug)]
pub(crate) struct ElementRule {
    pub name: &'static str,
    pub content: Content,
    pub required: Vec<&'static str>,
    pub attributes: Vec<&'static str>,
}

impl ElementRule {
    fn requires(mut self, names: &[&'static str]) -> Self {
        self.required.extend_from_slice(names);
        self
    }

    fn with_attributes(mut self, names: &[&'static str]) -> Self {
        self.attributes.extend_from_slice(names);
        self
    }

    pub(crate) fn collect_names(&self, out: &mut Vec<&'static str>) {
        out.push(self.name);
        if let Content::Children(children) = &self.content {
            for child in children {
                child.collect_names(out);
            }
        }
    }
}

fn flag(name: &'static str) -> ElementRule {
    ElementRule {
        name,
        content: Content::Flag,
        required: Vec::new(),
        attributes: Vec::new(),
    }
}

fn text(name: &'static str) -> ElementRule {
    ElementRule {
        name,
        content: Content::Text,
        required: Vec::new(),
        attributes: Vec::new(),
    }
}

fn node(name: &'static str, children: Vec<ElementRule>) -> ElementRule {
    ElementRule {
        name,
        content: Content::Children(children),
        required: Vec::new(),
        attributes: Vec::new(),
    }
}

fn default_action() -> ElementRule {
    node("default-action", vec![flag("allow"), flag("disallow")])
}

fn shutdown_modes() -> ElementRule {
    node("shutdown", vec![flag("egress"), flag("ingress"), flag("full")])
}

/// `vpn-name` under client profiles exists only from 6.2 on.
fn profile_keys(scoped: bool) -> (Vec<ElementRule>, Vec<&'static str>) {
    if scoped {
        (vec![text("name"), text("vpn-name")], vec!["name", "vpn-name"])
    } else {
        (vec![text("name")], vec!["name"])
    }
}

// ── show ─────────────────────────────────────────────────────────────

fn show(scoped: bool) -> ElementRule {
    let (mut profile, profile_required) = profile_keys(scoped);
    profile.push(flag("detail"));

    node(
        "show",
        vec![
            flag("version"),
            flag("memory"),
            node("redundancy", vec![flag("detail")]),
            node(
                "message-spool",
                vec![text("vpn-name"), flag("detail"), flag("stats")],
            ),
            node(
                "queue",
                vec![text("name"), text("vpn-name"), flag("detail")],
            )
            .requires(&["name"]),
            node(
                "client-username",
                vec![text("name"), text("vpn-name"), flag("detail")],
            )
            .requires(&["name"]),
            node(
                "client",
                vec![
                    text("name"),
                    text("vpn-name"),
                    flag("detail"),
                    flag("stats"),
                    flag("message-spool-stats"),
                ],
            )
            .requires(&["name"]),
            node(
                "message-vpn",
                vec![text("vpn-name"), flag("detail"), flag("stats")],
            )
            .requires(&["vpn-name"]),
            node("client-profile", profile).requires(&profile_required[..1]),
            node(
                "acl-profile",
                vec![text("name"), text("vpn-name"), flag("detail")],
            )
            .requires(&["name"]),
            node(
                "bridge",
                vec![text("bridge-name"), text("vpn-name"), flag("detail")],
            )
            .requires(&["bridge-name"]),
        ],
    )
}

// ── create / no ──────────────────────────────────────────────────────

fn create(scoped: bool) -> ElementRule {
    let (profile, profile_required) = profile_keys(scoped);
    node(
        "create",
        vec![
            node("message-vpn", vec![text("vpn-name")]).requires(&["vpn-name"]),
            node("client-username", vec![text("username"), text("vpn-name")])
                .requires(&["username", "vpn-name"]),
            node("client-profile", profile).requires(&profile_required),
            node("acl-profile", vec![text("name"), text("vpn-name")])
                .requires(&["name", "vpn-name"]),
            node(
                "bridge",
                vec![
                    text("bridge-name"),
                    text("vpn-name"),
                    flag("primary"),
                    flag("backup"),
                ],
            )
            .requires(&["bridge-name", "vpn-name"]),
        ],
    )
}

fn no(scoped: bool) -> ElementRule {
    let (profile, profile_required) = profile_keys(scoped);
    node(
        "no",
        vec![
            node("message-vpn", vec![text("vpn-name")]).requires(&["vpn-name"]),
            node("client-username", vec![text("username"), text("vpn-name")])
                .requires(&["username", "vpn-name"]),
            node("client-profile", profile).requires(&profile_required),
            node("acl-profile", vec![text("name"), text("vpn-name")])
                .requires(&["name", "vpn-name"]),
            node(
                "bridge",
                vec![
                    text("bridge-name"),
                    text("vpn-name"),
                    flag("primary"),
                    flag("backup"),
                ],
            )
            .requires(&["bridge-name", "vpn-name"]),
        ],
    )
}

// ── Object configuration ─────────────────────────────────────────────

fn message_spool() -> ElementRule {
    let queue = node(
        "queue",
        vec![
            text("name"),
            shutdown_modes(),
            node("no", vec![shutdown_modes()]),
            node("access-type", vec![flag("exclusive"), flag("non-exclusive")]),
            node("owner", vec![text("owner")]),
            node("max-bind-count", vec![text("value")]),
            node(
                "permission",
                vec![
                    flag("all"),
                    flag("no-access"),
                    flag("read-only"),
                    flag("consume"),
                    flag("modify-topic"),
                    flag("delete"),
                ],
            ),
            node("max-spool-usage", vec![text("size")]).requires(&["size"]),
            node("max-redelivery", vec![text("value")]).requires(&["value"]),
            flag("reject-msg-to-sender-on-discard"),
        ],
    )
    .requires(&["name"]);

    node(
        "message-spool",
        vec![
            text("vpn-name"),
            node("max-spool-usage", vec![text("size")]).requires(&["size"]),
            node(
                "create",
                vec![node("queue", vec![text("name")]).requires(&["name"])],
            ),
            queue,
            node(
                "no",
                vec![node("queue", vec![text("name")]).requires(&["name"])],
            ),
        ],
    )
    .requires(&["vpn-name"])
}

/// Operational actions that change no configuration.
fn admin() -> ElementRule {
    node(
        "admin",
        vec![node(
            "message-spool",
            vec![
                text("vpn-name"),
                node("delete-messages", vec![text("queue-name")]).requires(&["queue-name"]),
            ],
        )
        .requires(&["vpn-name", "delete-messages"])],
    )
}

fn message_vpn() -> ElementRule {
    node(
        "message-vpn",
        vec![
            text("vpn-name"),
            flag("shutdown"),
            node("no", vec![flag("shutdown")]),
            node(
                "authentication",
                vec![node(
                    "user-class",
                    vec![
                        flag("client"),
                        node("radius-domain", vec![text("radius-domain")]),
                        node(
                            "auth-type",
                            vec![
                                flag("internal"),
                                flag("radius"),
                                flag("ldap"),
                                flag("none"),
                            ],
                        ),
                    ],
                )],
            ),
            node(
                "event",
                vec![
                    node("large-message-threshold", vec![text("size")]),
                    node("log-tag", vec![text("tag-string")]),
                ],
            ),
            node("max-connections", vec![text("value")]),
        ],
    )
    .requires(&["vpn-name"])
}

fn client_username() -> ElementRule {
    node(
        "client-username",
        vec![
            text("username"),
            text("vpn-name"),
            flag("shutdown"),
            node(
                "no",
                vec![
                    flag("shutdown"),
                    flag("guaranteed-endpoint-permission-override"),
                    flag("subscription-manager"),
                ],
            ),
            flag("guaranteed-endpoint-permission-override"),
            flag("subscription-manager"),
            node("client-profile", vec![text("name")]).requires(&["name"]),
            node("acl-profile", vec![text("name")]).requires(&["name"]),
            node("password", vec![text("password")]),
        ],
    )
    .requires(&["username", "vpn-name"])
}

fn client_profile(scoped: bool) -> ElementRule {
    let (mut children, required) = profile_keys(scoped);
    children.extend([
        node(
            "message-spool",
            vec![
                flag("allow-guaranteed-message-send"),
                flag("allow-guaranteed-message-receive"),
                flag("allow-guaranteed-endpoint-create"),
                flag("allow-transacted-sessions"),
            ],
        ),
        node("max-connections-per-client-username", vec![text("value")]),
        flag("allow-bridge-connections"),
    ]);
    node("client-profile", children).requires(&required)
}

fn acl_profile() -> ElementRule {
    node(
        "acl-profile",
        vec![
            text("name"),
            text("vpn-name"),
            node("publish-topic", vec![default_action()]),
            node("subscribe-topic", vec![default_action()]),
            node("client-connect", vec![default_action()]),
        ],
    )
    .requires(&["name", "vpn-name"])
}

fn remote_message_vpn() -> ElementRule {
    node(
        "message-vpn",
        vec![
            text("vpn-name"),
            flag("connect-via"),
            text("addr"),
            flag("interface"),
            text("phys-intf"),
            flag("router"),
            text("virtual-router-name"),
            node("client-username", vec![text("name"), text("password")]),
            flag("shutdown"),
            node("no", vec![flag("shutdown")]),
        ],
    )
    .requires(&["vpn-name"])
}

fn bridge() -> ElementRule {
    node(
        "bridge",
        vec![
            text("bridge-name"),
            text("vpn-name"),
            flag("primary"),
            flag("backup"),
            flag("shutdown"),
            node("no", vec![flag("shutdown")]),
            node(
                "remote",
                vec![node("create", vec![remote_message_vpn()]), remote_message_vpn()],
            ),
        ],
    )
    .requires(&["bridge-name", "vpn-name"])
}

// ── Root ─────────────────────────────────────────────────────────────

/// The `<rpc>` grammar for a version.
pub(crate) fn rpc(version: &SempVersion) -> ElementRule {
    let scoped = version.vpn_scoped_client_profiles();
    node(
        "rpc",
        vec![
            show(scoped),
            create(scoped),
            no(scoped),
            admin(),
            message_spool(),
            message_vpn(),
            client_username(),
            client_profile(scoped),
            acl_profile(),
            bridge(),
        ],
    )
    .with_attributes(&["semp-version"])
}
