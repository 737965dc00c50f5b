use leptos::task::spawn_local;

use leptos::prelude::*;
use wasm_bindgen::prelude::*;

use crate::adapters::{ChromeCookieStore, ChromeKvStore};
use crate::chrome;
use crate::context::{self, PageContext};
use crate::mirror::{MirrorUpdate, StorageMirror};
use crate::model::{normalize_domain, Cookie, SameSite, StorageKind};
use crate::persist::{self, UiState};
use crate::reconciler::{export_snapshot, parse_import, Edit, ImportMode, Reconciler};

fn reconciler() -> Reconciler<ChromeKvStore, ChromeCookieStore> {
    Reconciler::new(ChromeKvStore, ChromeCookieStore)
}

const THEMES: [&str; 3] = ["dark", "light", "solar"];

fn theme_style(theme: &str) -> String {
    let (bg, bg2, text, muted, accent, border) = match theme {
        "light" => ("#ffffff", "#f4f5f7", "#1a1a1a", "#6b7280", "#4f46e5", "#d1d5db"),
        "solar" => ("#002b36", "#073642", "#eee8d5", "#93a1a1", "#b58900", "#586e75"),
        _ => ("#111418", "#1b2026", "#e5e7eb", "#9ca3af", "#6366f1", "#2d333b"),
    };
    format!(
        "--bg-primary: {bg}; --bg-secondary: {bg2}; --text-primary: {text}; --text-muted: {muted}; --accent-color: {accent}; --border-color: {border};"
    )
}

fn preview(raw: &str) -> String {
    const MAX: usize = 80;
    let mut out: String = raw.chars().take(MAX).collect();
    if raw.chars().count() > MAX {
        out.push('…');
    }
    out
}

/// Working copy of the entry being created or edited in the modal.
#[derive(Clone, Debug, PartialEq)]
struct EditDraft {
    kind: StorageKind,
    /// None when creating a new entry; a rename deletes this key first.
    original_key: Option<String>,
    key: String,
    value: String,
    domain: String,
    path: String,
    secure: bool,
    http_only: bool,
    same_site: SameSite,
    /// Raw text; empty means session-lifetime cookie.
    expiration: String,
}

impl EditDraft {
    fn blank(kind: StorageKind) -> EditDraft {
        EditDraft {
            kind,
            original_key: None,
            key: String::new(),
            value: String::new(),
            domain: String::new(),
            path: "/".to_string(),
            secure: false,
            http_only: false,
            same_site: SameSite::Unspecified,
            expiration: String::new(),
        }
    }

    fn for_kv(kind: StorageKind, key: &str, value: &str) -> EditDraft {
        EditDraft {
            original_key: Some(key.to_string()),
            key: key.to_string(),
            value: value.to_string(),
            ..EditDraft::blank(kind)
        }
    }

    fn for_cookie(cookie: &Cookie) -> EditDraft {
        EditDraft {
            kind: StorageKind::Cookies,
            original_key: Some(cookie.name.clone()),
            key: cookie.name.clone(),
            value: cookie.value.clone(),
            domain: cookie
                .domain
                .as_deref()
                .map(|d| normalize_domain(d).to_string())
                .unwrap_or_default(),
            path: cookie.path.clone(),
            secure: cookie.secure,
            http_only: cookie.http_only,
            same_site: cookie.same_site,
            expiration: cookie
                .expiration_date
                .map(|e| e.to_string())
                .unwrap_or_default(),
        }
    }

    fn to_cookie(&self) -> Cookie {
        Cookie {
            name: self.key.clone(),
            value: self.value.clone(),
            domain: {
                let trimmed = self.domain.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            },
            path: self.path.clone(),
            secure: self.secure,
            http_only: self.http_only,
            same_site: self.same_site,
            expiration_date: self.expiration.trim().parse::<f64>().ok(),
        }
    }
}

fn same_site_from_form(value: &str) -> SameSite {
    match value {
        "strict" => SameSite::Strict,
        "lax" => SameSite::Lax,
        "none" => SameSite::None,
        _ => SameSite::Unspecified,
    }
}

#[component]
pub fn App() -> impl IntoView {
    let (init_error, set_init_error) = signal(Option::<String>::None);
    let (page_ctx, set_page_ctx) = signal(Option::<PageContext>::None);
    let (mirror, set_mirror) = signal(StorageMirror::default());
    let (category, set_category) = signal(StorageKind::Local);
    let (search, set_search) = signal(String::new());
    let (theme, set_theme) = signal("dark".to_string());
    let (notice, set_notice) = signal(Option::<String>::None);
    let (editing, set_editing) = signal(Option::<EditDraft>::None);
    let (expanded_key, set_expanded_key) = signal(Option::<String>::None);
    let (open_tabs, set_open_tabs) = signal(Vec::<(PageContext, String)>::new());
    let (io_open, set_io_open) = signal(false);
    let (import_text, set_import_text) = signal(String::new());
    let (import_replace, set_import_replace) = signal(false);
    let (export_text, set_export_text) = signal(String::new());
    let (export_local, set_export_local) = signal(true);
    let (export_session, set_export_session) = signal(true);
    let (export_cookies, set_export_cookies) = signal(true);

    let bind_and_load = move |ctx: PageContext| {
        set_page_ctx.set(Some(ctx.clone()));
        set_mirror.update(|m| m.rebind(ctx.clone()));
        spawn_local(async move {
            let loaded = reconciler().load_all(&ctx).await;
            // apply() drops the result if the mirror was rebound meanwhile.
            set_mirror.update(|m| {
                m.apply(MirrorUpdate::Adopt(loaded));
            });
        });
    };

    // Restore UI state, resolve the context, and kick off the first load.
    Effect::new(move |_| {
        spawn_local(async move {
            if let Some(state) = persist::restore(chrome::now_ms()).await {
                set_category.set(state.category);
                set_search.set(state.search);
                set_theme.set(state.theme);
            } else if let Some(saved_theme) = persist::load_theme().await {
                set_theme.set(saved_theme);
            }

            let expanded = window()
                .location()
                .search()
                .unwrap_or_default()
                .contains("expanded=true");
            match context::resolve_initial_context(expanded).await {
                Ok(ctx) => {
                    bind_and_load(ctx);
                    if let Ok(tabs) = context::list_inspectable_tabs().await {
                        set_open_tabs.set(tabs);
                    }
                }
                Err(e) => set_init_error.set(Some(e)),
            }
        });
    });

    let save_ui_state = move || {
        let state = UiState {
            category: category.get_untracked(),
            search: search.get_untracked(),
            theme: theme.get_untracked(),
            saved_at_ms: chrome::now_ms(),
        };
        spawn_local(async move {
            persist::save(&state).await;
        });
    };

    let interval_cb = Closure::<dyn FnMut()>::new(move || save_ui_state());
    let _ = window().set_interval_with_callback_and_timeout_and_arguments_0(
        interval_cb.as_ref().unchecked_ref(),
        persist::SAVE_PERIOD_MS as i32,
    );
    interval_cb.forget();

    // One more snapshot on the way out; a killed popup loses at most one period.
    let pagehide_cb = Closure::<dyn FnMut(leptos::web_sys::Event)>::new(move |_e| save_ui_state());
    let _ = window()
        .add_event_listener_with_callback("pagehide", pagehide_cb.as_ref().unchecked_ref());
    pagehide_cb.forget();

    let refresh = move || {
        if let Some(ctx) = page_ctx.get_untracked() {
            bind_and_load(ctx);
        }
    };

    let choose_tab = move |tab_id: i32| {
        spawn_local(async move {
            match context::switch_context(tab_id).await {
                Ok(ctx) => bind_and_load(ctx),
                Err(e) => set_notice.set(Some(e)),
            }
        });
    };

    let submit_edit = move |draft: EditDraft| {
        let Some(ctx) = page_ctx.get_untracked() else {
            return;
        };
        set_editing.set(None);
        spawn_local(async move {
            let recon = reconciler();
            if let Some(original) = draft.original_key.clone() {
                if original != draft.key {
                    match recon.apply_delete(&ctx, draft.kind, &original).await {
                        Ok(update) => {
                            set_mirror.update(|m| {
                                m.apply(update);
                            });
                        }
                        Err(e) => log::warn!("rename: old entry {original} not removed: {e}"),
                    }
                }
            }
            let edit = match draft.kind.kv() {
                Some(kind) => Edit::KeyValue {
                    kind,
                    key: draft.key.clone(),
                    value: draft.value.clone(),
                },
                None => Edit::Cookie(draft.to_cookie()),
            };
            match recon.apply_edit(&ctx, edit).await {
                Ok(update) => {
                    set_mirror.update(|m| {
                        m.apply(update);
                    });
                }
                Err(e) => set_notice.set(Some(format!("Save failed: {e}"))),
            }
        });
    };

    let delete_entry = move |kind: StorageKind, key: String| {
        let Some(ctx) = page_ctx.get_untracked() else {
            return;
        };
        let confirmed = window()
            .confirm_with_message(&format!("Delete \"{key}\"?"))
            .unwrap_or(false);
        if !confirmed {
            return;
        }
        spawn_local(async move {
            match reconciler().apply_delete(&ctx, kind, &key).await {
                Ok(update) => {
                    set_mirror.update(|m| {
                        m.apply(update);
                    });
                }
                Err(e) => set_notice.set(Some(format!("Delete failed: {e}"))),
            }
        });
    };

    let run_import = move || {
        let Some(ctx) = page_ctx.get_untracked() else {
            return;
        };
        let payload = match parse_import(&import_text.get_untracked()) {
            Ok(payload) => payload,
            Err(e) => {
                set_notice.set(Some(e));
                return;
            }
        };
        let mode = if import_replace.get_untracked() {
            ImportMode::Replace
        } else {
            ImportMode::Merge
        };
        spawn_local(async move {
            let recon = reconciler();
            let current = mirror.get_untracked();
            let report = recon.import_bulk(&ctx, &current, &payload, mode).await;
            set_notice.set(Some(format!(
                "Imported {} items ({} writes failed, {} deletes failed)",
                report.applied, report.failed_writes, report.failed_deletes
            )));
            // Partial application is possible, so ground truth comes from a reload.
            let loaded = recon.load_all(&ctx).await;
            set_mirror.update(|m| {
                m.apply(MirrorUpdate::Adopt(loaded));
            });
        });
    };

    let run_export = move || {
        let mut kinds = Vec::new();
        if export_local.get_untracked() {
            kinds.push(StorageKind::Local);
        }
        if export_session.get_untracked() {
            kinds.push(StorageKind::Session);
        }
        if export_cookies.get_untracked() {
            kinds.push(StorageKind::Cookies);
        }
        let snapshot = export_snapshot(&mirror.get_untracked(), &kinds, chrome::now_iso());
        match serde_json::to_string_pretty(&snapshot) {
            Ok(text) => set_export_text.set(text),
            Err(e) => set_notice.set(Some(format!("Export failed: {e}"))),
        }
    };

    let kv_rows = move |kind: StorageKind| {
        let Some(kv_kind) = kind.kv() else {
            return view! { <div></div> }.into_any();
        };
        view! {
            <div>
                {move || mirror.get().search_kv(kv_kind, &search.get()).into_iter().map(|(key, shaped)| {
                    let edit_key = key.clone();
                    let del_key = key.clone();
                    let toggle_key = key.clone();
                    let row_key = key.clone();
                    let raw = shaped.raw().to_string();
                    let structured = shaped.is_structured();
                    let pretty = shaped.pretty();
                    let is_expanded = move || expanded_key.get().as_deref() == Some(row_key.as_str());
                    view! {
                        <div style="border-bottom: 1px solid var(--border-color); padding: 0.5rem 0.75rem;">
                            <div style="display: flex; align-items: center; gap: 0.5rem;">
                                <span style="font-weight: 600; overflow-wrap: anywhere;">{key.clone()}</span>
                                {structured.then(|| view! {
                                    <span
                                        style="font-size: 0.7rem; color: var(--accent-color); border: 1px solid var(--accent-color); border-radius: 3px; padding: 0 4px; cursor: pointer;"
                                        on:click=move |_| {
                                            if expanded_key.get_untracked().as_deref() == Some(toggle_key.as_str()) {
                                                set_expanded_key.set(None);
                                            } else {
                                                set_expanded_key.set(Some(toggle_key.clone()));
                                            }
                                        }
                                    >"JSON"</span>
                                })}
                                <span style="flex: 1;"></span>
                                <button
                                    style="background: transparent; border: none; color: var(--text-muted); cursor: pointer;"
                                    on:click=move |_| set_editing.set(Some(EditDraft::for_kv(kind, &edit_key, &raw)))
                                >"Edit"</button>
                                <button
                                    style="background: transparent; border: none; color: var(--text-muted); cursor: pointer;"
                                    on:click=move |_| delete_entry(kind, del_key.clone())
                                >"Delete"</button>
                            </div>
                            <div style="color: var(--text-muted); font-size: 0.85rem; overflow-wrap: anywhere;">
                                {preview(shaped.raw())}
                            </div>
                            {move || (is_expanded() && pretty.is_some()).then(|| view! {
                                <pre style="background: var(--bg-secondary); border-radius: 4px; padding: 0.5rem; font-size: 0.8rem; overflow-x: auto; margin: 0.4rem 0 0 0;">
                                    {pretty.clone().unwrap_or_default()}
                                </pre>
                            })}
                        </div>
                    }
                }).collect::<Vec<_>>()}
            </div>
        }
        .into_any()
    };

    let cookie_rows = move || {
        view! {
            <div>
                {move || mirror.get().search_cookies(&search.get()).into_iter().map(|cookie| {
                    let edit_cookie = cookie.clone();
                    let del_name = cookie.name.clone();
                    let display_domain = cookie
                        .domain
                        .as_deref()
                        .map(|d| normalize_domain(d).to_string())
                        .unwrap_or_else(|| "(host only)".to_string());
                    let expiry = cookie
                        .expiration_date
                        .map(|e| format!("expires {}", e as u64))
                        .unwrap_or_else(|| "session".to_string());
                    let mut flags = Vec::new();
                    if cookie.secure { flags.push("Secure"); }
                    if cookie.http_only { flags.push("HttpOnly"); }
                    let flags = if flags.is_empty() { String::new() } else { format!(" · {}", flags.join(" ")) };
                    view! {
                        <div style="border-bottom: 1px solid var(--border-color); padding: 0.5rem 0.75rem;">
                            <div style="display: flex; align-items: center; gap: 0.5rem;">
                                <span style="font-weight: 600; overflow-wrap: anywhere;">{cookie.name.clone()}</span>
                                <span style="flex: 1;"></span>
                                <button
                                    style="background: transparent; border: none; color: var(--text-muted); cursor: pointer;"
                                    on:click=move |_| set_editing.set(Some(EditDraft::for_cookie(&edit_cookie)))
                                >"Edit"</button>
                                <button
                                    style="background: transparent; border: none; color: var(--text-muted); cursor: pointer;"
                                    on:click=move |_| delete_entry(StorageKind::Cookies, del_name.clone())
                                >"Delete"</button>
                            </div>
                            <div style="color: var(--text-muted); font-size: 0.85rem; overflow-wrap: anywhere;">
                                {preview(&cookie.value)}
                            </div>
                            <div style="color: var(--text-muted); font-size: 0.75rem;">
                                {format!("{display_domain} · {} · {expiry}{flags}", cookie.path)}
                            </div>
                        </div>
                    }
                }).collect::<Vec<_>>()}
            </div>
        }
        .into_any()
    };

    let edit_modal = move || {
        editing.get().map(|draft| {
            let is_cookie = draft.kind == StorageKind::Cookies;
            view! {
                <div style="position: fixed; inset: 0; background: rgba(0,0,0,0.5); display: flex; align-items: center; justify-content: center;">
                    <div style="background: var(--bg-primary); border: 1px solid var(--border-color); border-radius: 8px; padding: 1rem; width: 90%; max-width: 420px; display: flex; flex-direction: column; gap: 0.6rem;">
                        <strong>{if draft.original_key.is_some() { "Edit entry" } else { "New entry" }}</strong>
                        <label style="font-size: 0.8rem; color: var(--text-muted);">{if is_cookie { "Name" } else { "Key" }}</label>
                        <input
                            style="padding: 0.4rem; border-radius: 4px; border: 1px solid var(--border-color); background: var(--bg-secondary); color: var(--text-primary);"
                            prop:value=move || editing.get().map(|d| d.key).unwrap_or_default()
                            on:input=move |e| set_editing.update(|d| if let Some(d) = d.as_mut() { d.key = event_target_value(&e); })
                        />
                        <label style="font-size: 0.8rem; color: var(--text-muted);">"Value"</label>
                        <textarea
                            style="padding: 0.4rem; border-radius: 4px; border: 1px solid var(--border-color); background: var(--bg-secondary); color: var(--text-primary); min-height: 80px; font-family: monospace;"
                            prop:value=move || editing.get().map(|d| d.value).unwrap_or_default()
                            on:input=move |e| set_editing.update(|d| if let Some(d) = d.as_mut() { d.value = event_target_value(&e); })
                        ></textarea>
                        {is_cookie.then(|| view! {
                            <div style="display: grid; grid-template-columns: 1fr 1fr; gap: 0.5rem;">
                                <div style="display: flex; flex-direction: column; gap: 0.2rem;">
                                    <label style="font-size: 0.8rem; color: var(--text-muted);">"Domain (empty = host only)"</label>
                                    <input
                                        style="padding: 0.4rem; border-radius: 4px; border: 1px solid var(--border-color); background: var(--bg-secondary); color: var(--text-primary);"
                                        prop:value=move || editing.get().map(|d| d.domain).unwrap_or_default()
                                        on:input=move |e| set_editing.update(|d| if let Some(d) = d.as_mut() { d.domain = event_target_value(&e); })
                                    />
                                </div>
                                <div style="display: flex; flex-direction: column; gap: 0.2rem;">
                                    <label style="font-size: 0.8rem; color: var(--text-muted);">"Path"</label>
                                    <input
                                        style="padding: 0.4rem; border-radius: 4px; border: 1px solid var(--border-color); background: var(--bg-secondary); color: var(--text-primary);"
                                        prop:value=move || editing.get().map(|d| d.path).unwrap_or_default()
                                        on:input=move |e| set_editing.update(|d| if let Some(d) = d.as_mut() { d.path = event_target_value(&e); })
                                    />
                                </div>
                                <div style="display: flex; flex-direction: column; gap: 0.2rem;">
                                    <label style="font-size: 0.8rem; color: var(--text-muted);">"SameSite"</label>
                                    <select
                                        style="padding: 0.4rem; border-radius: 4px; border: 1px solid var(--border-color); background: var(--bg-secondary); color: var(--text-primary);"
                                        on:change=move |e| set_editing.update(|d| if let Some(d) = d.as_mut() { d.same_site = same_site_from_form(&event_target_value(&e)); })
                                    >
                                        <option value="unspecified" selected=move || editing.get().is_some_and(|d| d.same_site == SameSite::Unspecified)>"unspecified (lax on write)"</option>
                                        <option value="lax" selected=move || editing.get().is_some_and(|d| d.same_site == SameSite::Lax)>"lax"</option>
                                        <option value="strict" selected=move || editing.get().is_some_and(|d| d.same_site == SameSite::Strict)>"strict"</option>
                                        <option value="none" selected=move || editing.get().is_some_and(|d| d.same_site == SameSite::None)>"none"</option>
                                    </select>
                                </div>
                                <div style="display: flex; flex-direction: column; gap: 0.2rem;">
                                    <label style="font-size: 0.8rem; color: var(--text-muted);">"Expires (epoch s, empty = session)"</label>
                                    <input
                                        style="padding: 0.4rem; border-radius: 4px; border: 1px solid var(--border-color); background: var(--bg-secondary); color: var(--text-primary);"
                                        prop:value=move || editing.get().map(|d| d.expiration).unwrap_or_default()
                                        on:input=move |e| set_editing.update(|d| if let Some(d) = d.as_mut() { d.expiration = event_target_value(&e); })
                                    />
                                </div>
                                <label style="font-size: 0.8rem; display: flex; gap: 0.3rem; align-items: center;">
                                    <input type="checkbox"
                                        prop:checked=move || editing.get().is_some_and(|d| d.secure)
                                        on:change=move |e| set_editing.update(|d| if let Some(d) = d.as_mut() { d.secure = event_target_checked(&e); })
                                    />"Secure"
                                </label>
                                <label style="font-size: 0.8rem; display: flex; gap: 0.3rem; align-items: center;">
                                    <input type="checkbox"
                                        prop:checked=move || editing.get().is_some_and(|d| d.http_only)
                                        on:change=move |e| set_editing.update(|d| if let Some(d) = d.as_mut() { d.http_only = event_target_checked(&e); })
                                    />"HttpOnly"
                                </label>
                            </div>
                        })}
                        <div style="display: flex; justify-content: flex-end; gap: 0.5rem; margin-top: 0.4rem;">
                            <button
                                style="padding: 0.4rem 0.8rem; border-radius: 4px; border: 1px solid var(--border-color); background: transparent; color: var(--text-primary); cursor: pointer;"
                                on:click=move |_| set_editing.set(None)
                            >"Cancel"</button>
                            <button
                                style="padding: 0.4rem 0.8rem; border-radius: 4px; border: none; background: var(--accent-color); color: white; cursor: pointer;"
                                on:click=move |_| {
                                    if let Some(draft) = editing.get_untracked() {
                                        if !draft.key.is_empty() {
                                            submit_edit(draft);
                                        }
                                    }
                                }
                            >"Save"</button>
                        </div>
                    </div>
                </div>
            }
        })
    };

    let io_panel = move || {
        io_open.get().then(|| view! {
            <div style="border-top: 1px solid var(--border-color); padding: 0.75rem; display: flex; flex-direction: column; gap: 0.5rem; background: var(--bg-secondary);">
                <strong style="font-size: 0.85rem;">"Export"</strong>
                <div style="display: flex; gap: 0.8rem; font-size: 0.8rem;">
                    <label><input type="checkbox" prop:checked=move || export_local.get() on:change=move |e| set_export_local.set(event_target_checked(&e)) />" local"</label>
                    <label><input type="checkbox" prop:checked=move || export_session.get() on:change=move |e| set_export_session.set(event_target_checked(&e)) />" session"</label>
                    <label><input type="checkbox" prop:checked=move || export_cookies.get() on:change=move |e| set_export_cookies.set(event_target_checked(&e)) />" cookies"</label>
                    <button
                        style="margin-left: auto; padding: 0.2rem 0.7rem; border-radius: 4px; border: none; background: var(--accent-color); color: white; cursor: pointer;"
                        on:click=move |_| run_export()
                    >"Export"</button>
                </div>
                {move || (!export_text.get().is_empty()).then(|| view! {
                    <textarea
                        readonly=true
                        style="min-height: 90px; font-family: monospace; font-size: 0.75rem; background: var(--bg-primary); color: var(--text-primary); border: 1px solid var(--border-color); border-radius: 4px;"
                        prop:value=move || export_text.get()
                    ></textarea>
                })}
                <strong style="font-size: 0.85rem;">"Import"</strong>
                <textarea
                    placeholder="Paste an export JSON here"
                    style="min-height: 90px; font-family: monospace; font-size: 0.75rem; background: var(--bg-primary); color: var(--text-primary); border: 1px solid var(--border-color); border-radius: 4px;"
                    prop:value=move || import_text.get()
                    on:input=move |e| set_import_text.set(event_target_value(&e))
                ></textarea>
                <div style="display: flex; gap: 0.8rem; align-items: center; font-size: 0.8rem;">
                    <label>
                        <input type="checkbox" prop:checked=move || import_replace.get() on:change=move |e| set_import_replace.set(event_target_checked(&e)) />
                        " Replace existing entries"
                    </label>
                    <button
                        style="margin-left: auto; padding: 0.2rem 0.7rem; border-radius: 4px; border: none; background: var(--accent-color); color: white; cursor: pointer;"
                        on:click=move |_| run_import()
                    >"Import"</button>
                </div>
            </div>
        })
    };

    view! {
        <main
            style=move || format!(
                "display: flex; flex-direction: column; width: 420px; min-height: 480px; max-height: 600px; background: var(--bg-primary); color: var(--text-primary); font-family: system-ui, sans-serif; font-size: 14px; {}",
                theme_style(&theme.get())
            )
        >
            {move || match init_error.get() {
                Some(err) => view! {
                    <div style="flex: 1; display: flex; align-items: center; justify-content: center; padding: 2rem; color: var(--text-muted); text-align: center;">
                        {err}
                    </div>
                }.into_any(),
                None => view! {
                    <header style="display: flex; align-items: center; gap: 0.5rem; padding: 0.6rem 0.75rem; border-bottom: 1px solid var(--border-color); background: var(--bg-secondary);">
                        <span style="font-weight: 700; color: var(--accent-color);">"sitestash"</span>
                        <select
                            style="flex: 1; min-width: 0; padding: 0.2rem; border-radius: 4px; border: 1px solid var(--border-color); background: var(--bg-primary); color: var(--text-primary);"
                            on:change=move |e| {
                                if let Ok(tab_id) = event_target_value(&e).parse::<i32>() {
                                    choose_tab(tab_id);
                                }
                            }
                        >
                            {move || {
                                let current = page_ctx.get().map(|c| c.tab_id);
                                open_tabs.get().into_iter().map(|(ctx, title)| {
                                    let selected = current == Some(ctx.tab_id);
                                    view! {
                                        <option value=ctx.tab_id.to_string() selected=selected>
                                            {format!("{} — {}", ctx.host, preview(&title))}
                                        </option>
                                    }
                                }).collect::<Vec<_>>()
                            }}
                        </select>
                        <button title="Reload" style="background: transparent; border: none; cursor: pointer; color: var(--text-muted); font-size: 1rem;" on:click=move |_| refresh()>"⟳"</button>
                        <button title="Import / export" style="background: transparent; border: none; cursor: pointer; color: var(--text-muted); font-size: 1rem;" on:click=move |_| set_io_open.update(|open| *open = !*open)>"⇅"</button>
                        <select
                            title="Theme"
                            style="padding: 0.2rem; border-radius: 4px; border: 1px solid var(--border-color); background: var(--bg-primary); color: var(--text-primary);"
                            on:change=move |e| {
                                let chosen = event_target_value(&e);
                                set_theme.set(chosen.clone());
                                spawn_local(async move { persist::save_theme(&chosen).await; });
                            }
                        >
                            {THEMES.iter().map(|t| {
                                let name = *t;
                                view! { <option value=name selected=move || theme.get() == name>{name}</option> }
                            }).collect::<Vec<_>>()}
                        </select>
                    </header>
                    {move || notice.get().map(|msg| view! {
                        <div
                            style="padding: 0.4rem 0.75rem; background: var(--bg-secondary); color: var(--accent-color); font-size: 0.8rem; cursor: pointer; border-bottom: 1px solid var(--border-color);"
                            title="Dismiss"
                            on:click=move |_| set_notice.set(None)
                        >{msg}</div>
                    })}
                    <nav style="display: flex; border-bottom: 1px solid var(--border-color);">
                        {StorageKind::ALL.iter().map(|k| {
                            let kind = *k;
                            let active = move || category.get() == kind;
                            view! {
                                <button
                                    style=move || format!(
                                        "flex: 1; padding: 0.5rem 0; border: none; cursor: pointer; font-size: 0.8rem; background: transparent; border-bottom: 2px solid {}; color: {};",
                                        if active() { "var(--accent-color)" } else { "transparent" },
                                        if active() { "var(--text-primary)" } else { "var(--text-muted)" },
                                    )
                                    on:click=move |_| set_category.set(kind)
                                >
                                    {move || {
                                        let m = mirror.get();
                                        let warn = if m.failed().contains(&kind) { " ⚠" } else { "" };
                                        format!("{} ({}){warn}", kind.label(), m.count(kind))
                                    }}
                                </button>
                            }
                        }).collect::<Vec<_>>()}
                    </nav>
                    <div style="display: flex; gap: 0.5rem; padding: 0.5rem 0.75rem; align-items: center;">
                        <input
                            placeholder="Search keys and values"
                            style="flex: 1; padding: 0.4rem; border-radius: 4px; border: 1px solid var(--border-color); background: var(--bg-secondary); color: var(--text-primary);"
                            prop:value=move || search.get()
                            on:input=move |e| set_search.set(event_target_value(&e))
                        />
                        <button
                            style="padding: 0.4rem 0.7rem; border-radius: 4px; border: none; background: var(--accent-color); color: white; cursor: pointer;"
                            on:click=move |_| set_editing.set(Some(EditDraft::blank(category.get_untracked())))
                        >"+ Add"</button>
                    </div>
                    <div style="flex: 1; overflow-y: auto;">
                        {move || match category.get() {
                            StorageKind::Cookies => cookie_rows(),
                            kind => kv_rows(kind),
                        }}
                    </div>
                    {io_panel}
                    {edit_modal}
                }.into_any(),
            }}
        </main>
    }
}
