/// Scripts executed inside the controlled page through WebDriver.
pub struct PageScripts;

impl PageScripts {
    /// Returns `null` while the document is still loading, otherwise
    /// `{mainMarkup, frames: [{selector, markup}]}` with script elements
    /// removed from cloned documents. Same-origin frames are followed into
    /// their own frames, depth first; a nested frame's selector is its
    /// ancestors' selectors joined with [`FRAME_PATH_SEPARATOR`].
    /// Cross-origin frames are skipped.
    ///
    /// [`FRAME_PATH_SEPARATOR`]: tandem_mirror::browser::FRAME_PATH_SEPARATOR
    pub fn capture() -> &'static str {
        r#"
        const doc = document;
        if (doc.readyState === 'loading' || !doc.documentElement) {
            return null;
        }
        const SEPARATOR = ' >>> ';
        const MAX_DEPTH = 8;
        function selectorFor(el) {
            const top = el.ownerDocument.documentElement;
            const steps = [];
            let node = el;
            while (node && node.nodeType === 1 && node !== top) {
                if (node.id) {
                    steps.unshift('#' + CSS.escape(node.id));
                    break;
                }
                let index = 1;
                let sibling = node;
                while ((sibling = sibling.previousElementSibling)) {
                    if (sibling.localName === node.localName) {
                        index++;
                    }
                }
                steps.unshift(node.localName + ':nth-of-type(' + index + ')');
                node = node.parentElement;
            }
            return steps.join(' > ');
        }
        function markupWithoutScripts(root) {
            const clone = root.cloneNode(true);
            clone.querySelectorAll('script').forEach((s) => s.remove());
            return clone.outerHTML;
        }
        const frames = [];
        function collect(owner, prefix, depth) {
            if (depth > MAX_DEPTH) {
                return;
            }
            owner.querySelectorAll('iframe').forEach((frame) => {
                let inner = null;
                try {
                    inner = frame.contentDocument;
                } catch (e) {
                    inner = null;
                }
                if (!inner || !inner.documentElement || inner.readyState === 'loading') {
                    return;
                }
                const selector = prefix + selectorFor(frame);
                frames.push({ selector: selector, markup: markupWithoutScripts(inner.documentElement) });
                collect(inner, selector + SEPARATOR, depth + 1);
            });
        }
        collect(doc, '', 1);
        return { mainMarkup: markupWithoutScripts(doc.documentElement), frames: frames };
        "#
    }

    /// `arguments`: css path, start, end. Returns whether a text control was found.
    pub fn native_selection() -> &'static str {
        r#"
        const [cssPath, start, end] = arguments;
        const el = document.querySelector(cssPath);
        if (!el || typeof el.setSelectionRange !== 'function') {
            return false;
        }
        el.selectionStart = start;
        el.selectionEnd = end;
        return true;
        "#
    }

    /// `arguments[0]`: `{start, end}` anchors of `{cssPath, nodePath, offset}`.
    /// Every path step must land on a child of the expected node type.
    pub fn range_selection() -> &'static str {
        r#"
        const range = arguments[0];
        function walk(root, path) {
            let node = root;
            for (const step of path) {
                const child = node.childNodes[step.index];
                if (!child || child.nodeType !== step.kind) {
                    return null;
                }
                node = child;
            }
            return node;
        }
        function resolve(anchor) {
            const el = document.querySelector(anchor.cssPath);
            if (!el) {
                return null;
            }
            return anchor.nodePath ? walk(el, anchor.nodePath) : el;
        }
        const start = resolve(range.start);
        const end = resolve(range.end);
        if (!start || !end) {
            return false;
        }
        const r = document.createRange();
        try {
            r.setStart(start, range.start.offset);
            r.setEnd(end, range.end.offset);
        } catch (e) {
            return false;
        }
        const selection = window.getSelection();
        selection.removeAllRanges();
        selection.addRange(r);
        return true;
        "#
    }
}
